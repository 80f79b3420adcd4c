//! Error types for binding materialization, the module registry and the loader

use std::io;

use lantern_sdk::AbiError;
use thiserror::Error;

/// Result of materializing a binding object
pub type BindResult<T> = Result<T, BindError>;

/// Result of resolving a module specifier
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors raised while turning binding objects into runtime values
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// The runtime refused to register a native type
    #[error("Failed to register type '{type_name}': {source}")]
    TypeRegistration {
        /// Name of the type
        type_name: String,
        /// Runtime error
        source: AbiError,
    },

    /// The runtime refused to create a native module record
    #[error("Failed to create module '{name}': {source}")]
    ModuleCreation {
        /// Module name
        name: String,
        /// Runtime error
        source: AbiError,
    },

    /// A name cannot be passed to the runtime (contains a NUL byte)
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Any other runtime call failed
    #[error(transparent)]
    Engine(#[from] AbiError),
}

/// Errors raised by [`ModuleRegistry`](crate::module::ModuleRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A module is already registered under this name
    #[error("Module '{0}' is already registered")]
    Conflict(String),
}

/// Errors raised while resolving an import specifier
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Specifier is not a registered module and its file could not be read
    #[error("Could not load module '{specifier}': {source}")]
    Read {
        /// Specifier as requested
        specifier: String,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Source text failed to compile; the runtime already holds the exception
    #[error("Failed to compile module '{specifier}': {source}")]
    Compile {
        /// Specifier as requested
        specifier: String,
        /// Runtime error
        source: AbiError,
    },

    /// Specifier could not be turned into an absolute path
    #[error("Path resolution failure for '{specifier}': {reason}")]
    PathResolution {
        /// Specifier as requested
        specifier: String,
        /// What went wrong
        reason: String,
    },

    /// Import-meta record could not be filled
    #[error("Failed to set import meta of '{url}': {source}")]
    ImportMeta {
        /// URL that was being recorded
        url: String,
        /// Runtime error
        source: AbiError,
    },

    /// Registered native module could not be instantiated
    #[error(transparent)]
    Binding(#[from] BindError),
}
