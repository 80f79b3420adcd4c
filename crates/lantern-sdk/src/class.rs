//! Native type identity and type definition records

use std::ffi::{c_char, c_void};
use std::num::NonZeroU32;

use crate::descriptor::{ClassCall, Finalizer, GcMarker};

/// Runtime-assigned identifier of a native type. Zero is never a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(NonZeroU32);

impl ClassId {
    /// Wrap a raw id, rejecting 0
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Raw id
    pub const fn get(&self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type definition handed to the runtime when a native type is registered.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ClassDef {
    /// Type name, NUL-terminated
    pub class_name: *const c_char,
    /// Called when an instance is collected
    pub finalizer: Option<Finalizer>,
    /// Reports values an instance keeps alive
    pub gc_mark: Option<GcMarker>,
    /// Makes instances of the type callable / constructible
    pub call: Option<ClassCall>,
    /// Exotic behaviour table, always null here
    pub exotic: *const c_void,
}

impl ClassDef {
    /// Definition with no callbacks and no exotic table
    pub const fn named(class_name: *const c_char) -> Self {
        Self {
            class_name,
            finalizer: None,
            gc_mark: None,
            call: None,
            exotic: std::ptr::null(),
        }
    }
}
