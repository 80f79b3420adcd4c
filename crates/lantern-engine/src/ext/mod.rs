//! Extension binding model
//!
//! Host code describes native objects, types and modules with these builders;
//! materializing them produces runtime values through an
//! [`EngineContext`](lantern_sdk::EngineContext).

mod class;
mod module;
mod object;

pub use class::{ExtensionClass, TypeIdentity};
pub use module::ExtensionModule;
pub use object::{
    shared, CopyPolicy, Extension, ExtensionObject, PropertyValue, SharedExtension, Undefined,
};
