//! ExtensionModule - a native module whose exports are an extension object
//!
//! A module record is created in two phases, matching the runtime's module
//! lifecycle: export *names* are declared when the record is created, export
//! *values* are bound when the runtime instantiates it.

use std::ffi::{c_int, CString};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use lantern_sdk::{EngineContext, ModuleData, ModuleHandle, NativeValue};
use tracing::{debug, error};

use super::object::{Extension, ExtensionObject};
use crate::error::{BindError, BindResult};

/// Native module description.
///
/// Every record and every child of the underlying object becomes one export.
#[derive(Debug, Default, Clone)]
pub struct ExtensionModule {
    exports: ExtensionObject,
}

impl ExtensionModule {
    /// Create a module with no exports
    pub fn new() -> Self {
        Self::default()
    }

    /// Move everything out, leaving an empty module
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Names this module exports, records first, then children
    pub fn export_names(&self) -> Vec<String> {
        let records = self.exports.entries().iter().map(|entry| {
            // SAFETY: record names live in `self.exports`' pool.
            unsafe { entry.name() }.to_string_lossy().into_owned()
        });
        records.chain(self.exports.child_names()).collect()
    }

    /// Declare every export name on `module` without binding values
    pub fn declare_exports(&self, ctx: &mut dyn EngineContext, module: ModuleHandle) -> BindResult<()> {
        if !self.exports.entries().is_empty() {
            ctx.add_module_export_list(module, self.exports.entries())?;
        }
        for child in self.exports.children() {
            ctx.add_module_export(module, child.name())?;
        }
        debug!(?module, exports = self.exports.len(), "declared module exports");
        Ok(())
    }

    /// Bind a value to every export declared by [`declare_exports`](Self::declare_exports)
    pub fn bind_exports(&self, ctx: &mut dyn EngineContext, module: ModuleHandle) -> BindResult<()> {
        if !self.exports.entries().is_empty() {
            ctx.set_module_export_list(module, self.exports.entries())?;
        }
        for child in self.exports.children() {
            let value = child.to_value(ctx)?;
            ctx.set_module_export(module, child.name(), value)?;
        }
        Ok(())
    }

    /// Create a native module record named `name` in `ctx`.
    ///
    /// Export names are declared immediately. The record remembers this
    /// module, and values are bound when the runtime instantiates it.
    ///
    /// # Errors
    /// * `BindError::InvalidName` - `name` contains a NUL byte
    /// * `BindError::ModuleCreation` - the runtime rejected the record or one
    ///   of its export names; a half-built record is discarded
    pub fn create_module(
        self: &Arc<Self>,
        ctx: &mut dyn EngineContext,
        name: &str,
    ) -> BindResult<ModuleHandle> {
        let c_name = CString::new(name).map_err(|_| BindError::InvalidName(name.to_string()))?;

        let module = ctx.new_c_module(&c_name, instantiate).map_err(|source| {
            error!(name, %source, "failed to create native module");
            BindError::ModuleCreation {
                name: name.to_string(),
                source,
            }
        })?;

        ctx.attach_module_data(module, Arc::clone(self) as ModuleData);
        if let Err(err) = self.declare_exports(ctx, module) {
            error!(name, %err, "failed to declare module exports");
            ctx.discard_module(module);
            return Err(match err {
                BindError::Engine(source) => BindError::ModuleCreation {
                    name: name.to_string(),
                    source,
                },
                other => other,
            });
        }
        Ok(module)
    }
}

/// Instantiation callback shared by every native module record.
fn instantiate(ctx: &mut dyn EngineContext, module: ModuleHandle) -> c_int {
    let Some(data) = ctx.module_data(module) else {
        error!(?module, "native module instantiated without host data");
        return -1;
    };
    let Ok(ext) = data.downcast::<ExtensionModule>() else {
        error!(?module, "native module host data has the wrong type");
        return -1;
    };

    match ext.bind_exports(ctx, module) {
        Ok(()) => 0,
        Err(err) => {
            error!(?module, %err, "failed to bind module exports");
            -1
        }
    }
}

impl Deref for ExtensionModule {
    type Target = ExtensionObject;

    fn deref(&self) -> &ExtensionObject {
        &self.exports
    }
}

impl DerefMut for ExtensionModule {
    fn deref_mut(&mut self) -> &mut ExtensionObject {
        &mut self.exports
    }
}

impl Extension for ExtensionModule {
    fn object(&self) -> &ExtensionObject {
        &self.exports
    }

    fn object_mut(&mut self) -> &mut ExtensionObject {
        &mut self.exports
    }

    /// A module nested in an object materializes as a plain namespace object
    fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        self.exports.to_value(ctx)
    }

    fn boxed_clone(&self) -> Box<dyn Extension> {
        Box::new(self.clone())
    }
}
