//! ExtensionObject - a native object described as data
//!
//! An extension object is an ordered list of descriptor records plus an
//! ordered list of named child objects. Every string a record points at lives
//! in the object's own [`StringPool`], so the records stay valid for as long as
//! the object does, wherever it is moved.
//!
//! Materialization (`to_value`) turns the description into a fresh runtime
//! object each time it is called.

use std::ffi::{c_char, c_int, CStr};
use std::sync::Arc;

use lantern_sdk::{
    EngineContext, FunctionListEntry, NativeFn, NativeFnMagic, NativeValue, PoolStr, PropFlags,
    StringPool,
};
use parking_lot::RwLock;

use crate::error::BindResult;

// ============================================================================
// Extension trait
// ============================================================================

/// Anything that can be nested inside an extension object.
///
/// Implemented by [`ExtensionObject`], [`ExtensionClass`](super::ExtensionClass)
/// and [`ExtensionModule`](super::ExtensionModule).
pub trait Extension: Send + Sync + 'static {
    /// The underlying descriptor object
    fn object(&self) -> &ExtensionObject;

    /// The underlying descriptor object, mutably
    fn object_mut(&mut self) -> &mut ExtensionObject;

    /// Build a fresh runtime value from this description
    fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue>;

    /// Independent deep copy
    fn boxed_clone(&self) -> Box<dyn Extension>;
}

/// Reference-counted extension shared between several parents.
///
/// Mutations through the lock are visible to every holder.
pub type SharedExtension = Arc<RwLock<dyn Extension>>;

/// Wrap an extension for sharing
pub fn shared<E: Extension>(ext: E) -> SharedExtension {
    Arc::new(RwLock::new(ext))
}

/// How a nested object is held when it is added to a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPolicy {
    /// Keep the reference-counted handle; copies of the parent share the child
    #[default]
    Shared,
    /// Snapshot the child now; the parent owns a private copy
    Deep,
}

// ============================================================================
// Property values
// ============================================================================

/// The `undefined` property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Undefined;

mod sealed {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f64 {}
    impl Sealed for &str {}
    impl Sealed for String {}
    impl Sealed for super::Undefined {}
}

/// Values accepted by [`ExtensionObject::add_property`].
///
/// Sealed: the descriptor format only has slots for these types.
pub trait PropertyValue: sealed::Sealed {
    #[doc(hidden)]
    fn into_entry(
        self,
        name: *const c_char,
        flags: PropFlags,
        strings: &mut StringPool,
    ) -> FunctionListEntry;
}

impl PropertyValue for i32 {
    fn into_entry(self, name: *const c_char, flags: PropFlags, _: &mut StringPool) -> FunctionListEntry {
        FunctionListEntry::int32(name, self, flags)
    }
}

impl PropertyValue for i64 {
    fn into_entry(self, name: *const c_char, flags: PropFlags, _: &mut StringPool) -> FunctionListEntry {
        FunctionListEntry::int64(name, self, flags)
    }
}

impl PropertyValue for f64 {
    fn into_entry(self, name: *const c_char, flags: PropFlags, _: &mut StringPool) -> FunctionListEntry {
        FunctionListEntry::double(name, self, flags)
    }
}

impl PropertyValue for &str {
    fn into_entry(
        self,
        name: *const c_char,
        flags: PropFlags,
        strings: &mut StringPool,
    ) -> FunctionListEntry {
        FunctionListEntry::string(name, strings.duplicate(self).as_ptr(), flags)
    }
}

impl PropertyValue for String {
    fn into_entry(
        self,
        name: *const c_char,
        flags: PropFlags,
        strings: &mut StringPool,
    ) -> FunctionListEntry {
        self.as_str().into_entry(name, flags, strings)
    }
}

impl PropertyValue for Undefined {
    fn into_entry(self, name: *const c_char, flags: PropFlags, _: &mut StringPool) -> FunctionListEntry {
        FunctionListEntry::undefined(name, flags)
    }
}

// ============================================================================
// Child references
// ============================================================================

enum ChildLink {
    Owned(Box<dyn Extension>),
    Shared(SharedExtension),
}

impl Clone for ChildLink {
    fn clone(&self) -> Self {
        match self {
            ChildLink::Owned(child) => ChildLink::Owned(child.boxed_clone()),
            ChildLink::Shared(child) => ChildLink::Shared(Arc::clone(child)),
        }
    }
}

/// Named nested object
pub(crate) struct ChildRef {
    name: PoolStr,
    link: ChildLink,
    flags: PropFlags,
}

impl ChildRef {
    /// Property / export name. Lives in the parent's pool.
    pub(crate) fn name(&self) -> &CStr {
        // SAFETY: `name` was issued by the pool of the object holding this
        // child, and children never outlive their parent.
        unsafe { self.name.as_c_str() }
    }

    pub(crate) fn flags(&self) -> PropFlags {
        self.flags
    }

    pub(crate) fn is_shared(&self) -> bool {
        matches!(self.link, ChildLink::Shared(_))
    }

    pub(crate) fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        match &self.link {
            ChildLink::Owned(child) => child.to_value(ctx),
            ChildLink::Shared(child) => child.read().to_value(ctx),
        }
    }
}

// ============================================================================
// ExtensionObject
// ============================================================================

/// Native object description: descriptor records plus named children.
#[derive(Default)]
pub struct ExtensionObject {
    strings: StringPool,
    entries: Vec<FunctionListEntry>,
    children: Vec<ChildRef>,
}

impl ExtensionObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern(&mut self, text: &str) -> *const c_char {
        self.strings.duplicate(text).as_ptr()
    }

    pub(crate) fn push_entry(&mut self, entry: FunctionListEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn children(&self) -> &[ChildRef] {
        &self.children
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Add a native function
    ///
    /// # Arguments
    /// * `name` - Property name
    /// * `func` - Native entry point
    /// * `arity` - Declared parameter count
    pub fn add_function(&mut self, name: &str, func: NativeFn, arity: u8) {
        let name = self.intern(name);
        self.push_entry(FunctionListEntry::function(name, arity, func));
    }

    /// Add a native function that receives `magic` on every call.
    ///
    /// Lets one entry point serve several exported names.
    pub fn add_function_magic(&mut self, name: &str, func: NativeFnMagic, arity: u8, magic: i16) {
        let name = self.intern(name);
        self.push_entry(FunctionListEntry::function_magic(name, arity, func, magic));
    }

    /// Add a constant-valued property.
    ///
    /// Accepts `i32`, `i64`, `f64`, `&str`, `String` and [`Undefined`].
    pub fn add_property<V: PropertyValue>(&mut self, name: &str, value: V, flags: PropFlags) {
        let name = self.intern(name);
        let entry = value.into_entry(name, flags, &mut self.strings);
        self.push_entry(entry);
    }

    /// Add a nested object built from a static descriptor table.
    ///
    /// The table is referenced, not copied.
    pub fn add_nested_table(
        &mut self,
        name: &str,
        table: &'static [FunctionListEntry],
        flags: PropFlags,
    ) {
        let name = self.intern(name);
        self.push_entry(FunctionListEntry::object(name, table, flags));
    }

    /// Add a nested extension object.
    ///
    /// With [`CopyPolicy::Deep`] the child is snapshotted right away and later
    /// changes to `child` are not seen here. With [`CopyPolicy::Shared`] this
    /// object keeps a handle to `child`.
    pub fn add_nested_object(
        &mut self,
        name: &str,
        child: &SharedExtension,
        policy: CopyPolicy,
        flags: PropFlags,
    ) {
        let link = match policy {
            CopyPolicy::Shared => ChildLink::Shared(Arc::clone(child)),
            CopyPolicy::Deep => ChildLink::Owned(child.read().boxed_clone()),
        };
        self.push_child(name, link, flags);
    }

    /// Add a nested extension shared with other holders
    pub fn add_shared_object(&mut self, name: &str, child: SharedExtension, flags: PropFlags) {
        self.push_child(name, ChildLink::Shared(child), flags);
    }

    /// Add a nested extension owned by this object alone
    pub fn add_owned_object<E: Extension>(&mut self, name: &str, child: E, flags: PropFlags) {
        self.push_child(name, ChildLink::Owned(Box::new(child)), flags);
    }

    fn push_child(&mut self, name: &str, link: ChildLink, flags: PropFlags) {
        let name = self.strings.duplicate(name);
        self.children.push(ChildRef { name, link, flags });
    }

    /// Add `name` as an alias of `target`.
    ///
    /// A `base` of -1 resolves `target` on this same object.
    pub fn add_alias(&mut self, name: &str, target: &str, base: c_int) {
        let name = self.intern(name);
        let target = self.intern(target);
        self.push_entry(FunctionListEntry::alias(name, target, base));
    }

    /// Add `name` as an alias of `target` on this same object
    pub fn add_alias_of(&mut self, name: &str, target: &str) {
        self.add_alias(name, target, -1);
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Create a runtime object carrying every entry and child.
    ///
    /// Each call builds a new object. If anything fails after the object was
    /// allocated, the object is released before the error is returned.
    pub fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        let obj = ctx.new_object()?;
        if let Err(err) = self.populate(ctx, obj) {
            ctx.free_value(obj);
            return Err(err);
        }
        Ok(obj)
    }

    fn populate(&self, ctx: &mut dyn EngineContext, obj: NativeValue) -> BindResult<()> {
        if !self.entries.is_empty() {
            ctx.set_property_list(obj, &self.entries)?;
        }
        for child in &self.children {
            let value = child.to_value(ctx)?;
            ctx.define_property(obj, child.name(), value, child.flags())?;
        }
        Ok(())
    }

    // ========================================================================
    // Moves and inspection
    // ========================================================================

    /// Move everything out, leaving this object empty
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Descriptor records in insertion order
    pub fn entries(&self) -> &[FunctionListEntry] {
        &self.entries
    }

    /// Number of members (records and children)
    pub fn len(&self) -> usize {
        self.entries.len() + self.children.len()
    }

    /// True if the object has no members
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }

    /// Number of nested extension objects
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Names of nested extension objects, in insertion order
    pub fn child_names(&self) -> Vec<String> {
        self.children
            .iter()
            .map(|child| child.name().to_string_lossy().into_owned())
            .collect()
    }

    /// Names of shared (not deep-copied) children
    pub fn shared_child_names(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|child| child.is_shared())
            .map(|child| child.name().to_string_lossy().into_owned())
            .collect()
    }

    /// Does `ptr` point into this object's string pool?
    pub fn owns_string(&self, ptr: *const c_char) -> bool {
        self.strings.owns(ptr)
    }
}

impl Clone for ExtensionObject {
    /// Copy with a private string pool.
    ///
    /// Every record is re-pointed at the new pool; owned children are deep
    /// copied and shared children stay shared.
    fn clone(&self) -> Self {
        let mut strings = StringPool::new();

        let entries = self
            .entries
            .iter()
            .map(|entry| {
                // SAFETY: every string of our records lives in `self.strings`.
                unsafe { entry.map_strings(|s| strings.duplicate_bytes(s.to_bytes()).as_ptr()) }
            })
            .collect();

        let children = self
            .children
            .iter()
            .map(|child| ChildRef {
                name: strings.duplicate_bytes(child.name().to_bytes()),
                link: child.link.clone(),
                flags: child.flags,
            })
            .collect();

        Self {
            strings,
            entries,
            children,
        }
    }
}

impl std::fmt::Debug for ExtensionObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionObject")
            .field("entries", &self.entries.len())
            .field("children", &self.child_names())
            .field("strings", &self.strings.len())
            .finish()
    }
}

impl Extension for ExtensionObject {
    fn object(&self) -> &ExtensionObject {
        self
    }

    fn object_mut(&mut self) -> &mut ExtensionObject {
        self
    }

    fn to_value(&self, ctx: &mut dyn EngineContext) -> BindResult<NativeValue> {
        ExtensionObject::to_value(self, ctx)
    }

    fn boxed_clone(&self) -> Box<dyn Extension> {
        Box::new(self.clone())
    }
}
