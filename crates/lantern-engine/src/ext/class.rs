//! ExtensionClass - a native type: prototype description plus type callbacks
//!
//! The runtime knows a native type by a numeric [`ClassId`]. The id is
//! allocated and the type registered the first time the class is
//! materialized; every later materialization reuses it.

use std::ffi::CString;
use std::ops::{Deref, DerefMut};

use lantern_sdk::{
    ClassCall, ClassDef, ClassId, EngineContext, Finalizer, FunctionListEntry, GcMarker, Getter,
    NativeValue, Setter,
};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::object::{Extension, ExtensionObject};
use crate::error::{BindError, BindResult};

/// Registration state of a native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeIdentity {
    /// Not registered with any runtime yet
    #[default]
    Unassigned,
    /// Registered under this id
    Assigned(ClassId),
}

/// Native type description.
///
/// Dereferences to its prototype [`ExtensionObject`], so functions and
/// properties are added the same way as on a plain object.
#[derive(Default)]
pub struct ExtensionClass {
    prototype: ExtensionObject,
    type_name: CString,
    constructor: Option<ClassCall>,
    finalizer: Option<Finalizer>,
    gc_marker: Option<GcMarker>,
    identity: Mutex<TypeIdentity>,
}

impl ExtensionClass {
    /// Create a class named `type_name`.
    ///
    /// A name containing a NUL byte is cut at that byte.
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: c_name(type_name),
            ..Self::default()
        }
    }

    /// Type name as registered with the runtime
    pub fn type_name(&self) -> &str {
        self.type_name.to_str().unwrap_or_default()
    }

    /// Set the call/construct handler
    pub fn set_constructor(&mut self, func: ClassCall) {
        self.constructor = Some(func);
    }

    /// Set the handler run when an instance is collected
    pub fn set_finalizer(&mut self, func: Finalizer) {
        self.finalizer = Some(func);
    }

    /// Set the handler reporting values an instance keeps alive
    pub fn set_gc_marker(&mut self, func: GcMarker) {
        self.gc_marker = Some(func);
    }

    /// Add a getter/setter pair on the prototype
    pub fn add_accessor(&mut self, name: &str, getter: Option<Getter>, setter: Option<Setter>) {
        let name = self.prototype.intern(name);
        self.prototype
            .push_entry(FunctionListEntry::accessor(name, getter, setter));
    }

    /// Current registration state
    pub fn type_identity(&self) -> TypeIdentity {
        *self.identity.lock()
    }

    /// Runtime type id, once registered
    pub fn class_id(&self) -> Option<ClassId> {
        match self.type_identity() {
            TypeIdentity::Assigned(id) => Some(id),
            TypeIdentity::Unassigned => None,
        }
    }

    /// Does this class have a constructor?
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Move everything out, leaving an unnamed, unregistered class behind
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Register the type if needed and build its prototype.
    ///
    /// # Steps
    /// 1. Allocate a type id and register the type (first call only)
    /// 2. Materialize the prototype object
    /// 3. Install it as the prototype of the type
    /// 4. Mark it constructible when a constructor is set
    pub fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        let id = self.ensure_registered(ctx)?;

        let proto = self.prototype.to_value(ctx)?;
        ctx.set_class_proto(id, proto);

        if self.constructor.is_some() {
            if let Err(err) = ctx.set_constructor_bit(proto, true) {
                ctx.free_value(proto);
                return Err(err.into());
            }
        }
        Ok(proto)
    }

    fn ensure_registered(&self, ctx: &mut dyn EngineContext) -> BindResult<ClassId> {
        // Held across registration so concurrent materializations cannot
        // register the type twice.
        let mut identity = self.identity.lock();
        if let TypeIdentity::Assigned(id) = *identity {
            return Ok(id);
        }

        let registered = ctx
            .new_class_id()
            .and_then(|id| ctx.new_class(id, &self.class_def()).map(|()| id));

        match registered {
            Ok(id) => {
                debug!(type_name = self.type_name(), class_id = id.get(), "registered native type");
                *identity = TypeIdentity::Assigned(id);
                Ok(id)
            }
            Err(source) => {
                error!(type_name = self.type_name(), %source, "failed to register native type");
                Err(BindError::TypeRegistration {
                    type_name: self.type_name().to_string(),
                    source,
                })
            }
        }
    }

    fn class_def(&self) -> ClassDef {
        ClassDef {
            finalizer: self.finalizer,
            gc_mark: self.gc_marker,
            call: self.constructor,
            ..ClassDef::named(self.type_name.as_ptr())
        }
    }
}

fn c_name(name: &str) -> CString {
    let end = name.find('\0').unwrap_or(name.len());
    if end < name.len() {
        warn!(name, "interior NUL in type name, truncating");
    }
    CString::new(&name[..end]).unwrap_or_default()
}

impl Clone for ExtensionClass {
    /// Copy the prototype, the callbacks and the registration state.
    ///
    /// A copy of a registered class shares its type id.
    fn clone(&self) -> Self {
        Self {
            prototype: self.prototype.clone(),
            type_name: self.type_name.clone(),
            constructor: self.constructor,
            finalizer: self.finalizer,
            gc_marker: self.gc_marker,
            identity: Mutex::new(self.type_identity()),
        }
    }
}

impl Deref for ExtensionClass {
    type Target = ExtensionObject;

    fn deref(&self) -> &ExtensionObject {
        &self.prototype
    }
}

impl DerefMut for ExtensionClass {
    fn deref_mut(&mut self) -> &mut ExtensionObject {
        &mut self.prototype
    }
}

impl std::fmt::Debug for ExtensionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionClass")
            .field("type_name", &self.type_name)
            .field("identity", &self.type_identity())
            .field("prototype", &self.prototype)
            .finish()
    }
}

impl Extension for ExtensionClass {
    fn object(&self) -> &ExtensionObject {
        &self.prototype
    }

    fn object_mut(&mut self) -> &mut ExtensionObject {
        &mut self.prototype
    }

    fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        ExtensionClass::to_value(self, ctx)
    }

    fn boxed_clone(&self) -> Box<dyn Extension> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_sdk::{DefType, PropFlags, RawContext};
    use std::ffi::c_int;

    extern "C" fn get_x(_ctx: *mut RawContext, _this: NativeValue) -> NativeValue {
        NativeValue::i32(0)
    }

    extern "C" fn construct(
        _ctx: *mut RawContext,
        _func: NativeValue,
        _this: NativeValue,
        _argc: c_int,
        _argv: *const NativeValue,
        _flags: c_int,
    ) -> NativeValue {
        NativeValue::undefined()
    }

    #[test]
    fn test_new_class_is_unassigned() {
        let class = ExtensionClass::new("Point");
        assert_eq!(class.type_name(), "Point");
        assert_eq!(class.type_identity(), TypeIdentity::Unassigned);
        assert!(class.class_id().is_none());
    }

    #[test]
    fn test_accessor_goes_on_prototype() {
        let mut class = ExtensionClass::new("Point");
        class.add_accessor("x", Some(get_x), None);
        class.add_property("dims", 2, PropFlags::NONE);

        assert_eq!(class.entries()[0].def_type(), DefType::CGetSet);
        assert_eq!(class.entries()[0].flags(), PropFlags::CONFIGURABLE);
        assert_eq!(class.len(), 2);
    }

    #[test]
    fn test_take_resets_source() {
        let mut class = ExtensionClass::new("Point");
        class.set_constructor(construct);
        class.add_accessor("x", Some(get_x), None);

        let moved = class.take();
        assert_eq!(moved.type_name(), "Point");
        assert!(moved.has_constructor());
        assert_eq!(class.type_name(), "");
        assert!(!class.has_constructor());
        assert!(class.is_empty());
        assert_eq!(class.type_identity(), TypeIdentity::Unassigned);
    }

    #[test]
    fn test_nul_in_type_name_is_truncated() {
        let class = ExtensionClass::new("Po\0int");
        assert_eq!(class.type_name(), "Po");
    }
}
