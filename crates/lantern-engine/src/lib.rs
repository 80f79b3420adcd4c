//! Lantern engine - native extension bindings for an embedded script runtime
//!
//! Host code describes what it wants to expose with the builders in [`ext`]:
//!
//! - [`ExtensionObject`]: functions, constant properties, aliases and nested
//!   objects
//! - [`ExtensionClass`]: a native type with constructor, finalizer and GC hooks
//! - [`ExtensionModule`]: an importable module
//!
//! Modules are registered by name in a [`ModuleRegistry`]. The
//! [`ModuleLoader`] answers the runtime's import requests, trying the registry
//! before compiling source files.
//!
//! All runtime access goes through the [`EngineContext`](lantern_sdk::EngineContext)
//! trait from `lantern-sdk`.

#![warn(missing_docs)]

pub mod error;
pub mod ext;
pub mod module;

pub use error::{BindError, BindResult, LoaderError, LoaderResult, RegistryError};
pub use ext::{
    shared, CopyPolicy, Extension, ExtensionClass, ExtensionModule, ExtensionObject,
    PropertyValue, SharedExtension, TypeIdentity, Undefined,
};
pub use module::{module_url, FsReader, LoaderOptions, ModuleLoader, ModuleRegistry, SourceReader};

pub use lantern_sdk as sdk;
