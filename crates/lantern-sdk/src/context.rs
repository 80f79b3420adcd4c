//! EngineContext trait - the runtime operations the binding layer needs
//!
//! The scripting engine implements this trait over one runtime context.
//! Binding objects, the module registry and the loader only ever talk to
//! the engine through it, so they never depend on engine internals.

use std::any::Any;
use std::ffi::{c_int, CStr};
use std::sync::Arc;

use crate::class::{ClassDef, ClassId};
use crate::descriptor::{FunctionListEntry, PropFlags};
use crate::error::AbiResult;
use crate::value::NativeValue;

/// Handle of a module record owned by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub u64);

/// Host data associated with a module record.
pub type ModuleData = Arc<dyn Any + Send + Sync>;

/// Instantiation callback of a native module record.
///
/// Returns 0 on success, -1 on failure (with an exception pending).
pub type ModuleInitFn = fn(ctx: &mut dyn EngineContext, module: ModuleHandle) -> c_int;

/// Contents of a compiled module's import-meta record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMeta {
    /// Canonical URL of the module
    pub url: String,
    /// True for the program entry module
    pub main: bool,
}

/// Abstract runtime context.
///
/// One implementation exists per runtime context; it is only ever used from
/// the thread that owns that context.
pub trait EngineContext {
    // ========================================================================
    // Objects
    // ========================================================================

    /// Allocate a new plain object
    fn new_object(&mut self) -> AbiResult<NativeValue>;

    /// Release a value previously returned by the runtime
    fn free_value(&mut self, value: NativeValue);

    /// Install a descriptor array on `obj`
    fn set_property_list(&mut self, obj: NativeValue, entries: &[FunctionListEntry])
        -> AbiResult<()>;

    /// Define a named property; ownership of `value` moves to `obj`
    fn define_property(
        &mut self,
        obj: NativeValue,
        name: &CStr,
        value: NativeValue,
        flags: PropFlags,
    ) -> AbiResult<()>;

    // ========================================================================
    // Native types
    // ========================================================================

    /// Allocate a fresh type identifier
    fn new_class_id(&mut self) -> AbiResult<ClassId>;

    /// Register a type definition under `id`
    fn new_class(&mut self, id: ClassId, def: &ClassDef) -> AbiResult<()>;

    /// Use `proto` as the prototype of instances of `id`
    fn set_class_proto(&mut self, id: ClassId, proto: NativeValue);

    /// Mark `func` as usable as a constructor
    fn set_constructor_bit(&mut self, func: NativeValue, on: bool) -> AbiResult<()>;

    // ========================================================================
    // Module records
    // ========================================================================

    /// Create a native module record; `init` runs when the record is instantiated
    fn new_c_module(&mut self, name: &CStr, init: ModuleInitFn) -> AbiResult<ModuleHandle>;

    /// Declare one export name
    fn add_module_export(&mut self, module: ModuleHandle, name: &CStr) -> AbiResult<()>;

    /// Declare the names of a descriptor array as exports
    fn add_module_export_list(
        &mut self,
        module: ModuleHandle,
        entries: &[FunctionListEntry],
    ) -> AbiResult<()>;

    /// Bind a value to a declared export; ownership of `value` moves to the record
    fn set_module_export(
        &mut self,
        module: ModuleHandle,
        name: &CStr,
        value: NativeValue,
    ) -> AbiResult<()>;

    /// Bind the values of a descriptor array to declared exports
    fn set_module_export_list(
        &mut self,
        module: ModuleHandle,
        entries: &[FunctionListEntry],
    ) -> AbiResult<()>;

    /// Associate host data with a module record, replacing any earlier association
    fn attach_module_data(&mut self, module: ModuleHandle, data: ModuleData);

    /// Host data associated with a module record
    fn module_data(&self, module: ModuleHandle) -> Option<ModuleData>;

    // ========================================================================
    // Source modules
    // ========================================================================

    /// Compile `source` as a module body without executing it
    fn compile_module(&mut self, source: &[u8], name: &CStr) -> AbiResult<ModuleHandle>;

    /// Drop a compiled module that will not be returned to the runtime
    fn discard_module(&mut self, module: ModuleHandle);

    /// Fill the import-meta record of a compiled module
    fn set_import_meta(&mut self, module: ModuleHandle, meta: &ImportMeta) -> AbiResult<()>;

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Raise a reference error; returns the exception marker
    fn throw_reference_error(&mut self, message: &str) -> NativeValue;

    /// Raise a type error; returns the exception marker
    fn throw_type_error(&mut self, message: &str) -> NativeValue;
}
