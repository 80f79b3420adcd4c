//! Lantern SDK - ABI-level types for native extensions
//!
//! This crate holds everything that crosses the boundary between host code and
//! the embedded script runtime: the tagged [`NativeValue`], the flat
//! [`FunctionListEntry`] descriptor records, native callback signatures, type
//! definitions, the [`StringPool`] that keeps descriptor strings alive, and the
//! [`EngineContext`] trait the runtime implements.
//!
//! The binding model itself (objects, classes, modules, registry, loader) lives
//! in `lantern-engine`.

#![warn(missing_docs)]

pub mod class;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod pool;
pub mod value;

pub use class::{ClassDef, ClassId};
pub use context::{EngineContext, ImportMeta, ModuleData, ModuleHandle, ModuleInitFn};
pub use descriptor::{
    ClassCall, DefType, EntryKind, Finalizer, FunctionListEntry, GcMarker, Getter, MarkFn,
    NativeFn, NativeFnMagic, PropFlags, Setter,
};
pub use error::{AbiError, AbiResult};
pub use pool::{PoolStr, StringPool};
pub use value::{NativeValue, RawContext, RawRuntime, ValueKind};
