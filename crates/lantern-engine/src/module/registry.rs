//! Name → native module map consulted by the loader
//!
//! Hosts register built-in modules here at startup. A registered name shadows
//! any file of the same name during import resolution.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::ext::ExtensionModule;

static MODULE_REGISTRY: LazyLock<RwLock<ModuleRegistry>> =
    LazyLock::new(|| RwLock::new(ModuleRegistry::new()));

/// Registry of native modules, indexed by import name
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    by_name: FxHashMap<String, Arc<ExtensionModule>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first use.
    ///
    /// Components that only need *a* registry should take a reference instead.
    pub fn global() -> &'static RwLock<ModuleRegistry> {
        &MODULE_REGISTRY
    }

    /// Register a module under `name`
    ///
    /// An existing registration is never replaced.
    ///
    /// # Arguments
    /// * `name` - Import name (e.g., "std:os")
    /// * `module` - The module
    ///
    /// # Returns
    /// * `Ok(())` - Module registered
    /// * `Err(RegistryError::Conflict)` - Name already taken, registry unchanged
    pub fn register(
        &mut self,
        name: impl Into<String>,
        module: ExtensionModule,
    ) -> Result<(), RegistryError> {
        self.register_shared(name, Arc::new(module))
    }

    /// Register an already shared module under `name`
    ///
    /// Same conflict rules as [`register`](Self::register).
    pub fn register_shared(
        &mut self,
        name: impl Into<String>,
        module: Arc<ExtensionModule>,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if self.by_name.contains_key(&name) {
            warn!(name = %name, "native module already registered, keeping existing");
            return Err(RegistryError::Conflict(name));
        }

        info!(name = %name, exports = module.len(), "registered native module");
        self.by_name.insert(name, module);
        Ok(())
    }

    /// Get a module by name
    pub fn lookup(&self, name: &str) -> Option<Arc<ExtensionModule>> {
        self.by_name.get(name).cloned()
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Remove a module
    ///
    /// # Returns
    /// The removed module, or `None` if nothing was registered under `name`
    pub fn unregister(&mut self, name: &str) -> Option<Arc<ExtensionModule>> {
        let removed = self.by_name.remove(name);
        match removed {
            Some(_) => info!(name, "unregistered native module"),
            None => info!(name, "unregister: no native module with this name"),
        }
        removed
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Remove every module
    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_sdk::PropFlags;

    fn module_with(value: i32) -> ExtensionModule {
        let mut module = ExtensionModule::new();
        module.add_property("value", value, PropFlags::C_W_E);
        module
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ModuleRegistry::new();
        registry.register("std:os", module_with(1)).unwrap();

        assert!(registry.contains("std:os"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("std:os").unwrap().export_names(), ["value"]);
        assert!(registry.lookup("std:fs").is_none());
    }

    #[test]
    fn test_conflict_keeps_first() {
        let mut registry = ModuleRegistry::new();
        let first = Arc::new(module_with(1));
        registry.register_shared("m", Arc::clone(&first)).unwrap();

        let err = registry.register("m", module_with(2)).unwrap_err();
        assert_eq!(err, RegistryError::Conflict("m".to_string()));
        assert!(Arc::ptr_eq(&registry.lookup("m").unwrap(), &first));
    }

    #[test]
    fn test_unregister_missing_is_noop() {
        let mut registry = ModuleRegistry::new();
        registry.register("a", ExtensionModule::new()).unwrap();

        assert!(registry.unregister("b").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_sorted_and_clear() {
        let mut registry = ModuleRegistry::new();
        registry.register("b", ExtensionModule::new()).unwrap();
        registry.register("a", ExtensionModule::new()).unwrap();
        assert_eq!(registry.names(), ["a", "b"]);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_global_is_single_instance() {
        let a = ModuleRegistry::global() as *const _;
        let b = ModuleRegistry::global() as *const _;
        assert_eq!(a, b);
    }
}
