//! Module system components
//!
//! The registry of native modules and the loader that resolves import
//! specifiers against it before falling back to source files.

mod loader;
mod registry;

pub use loader::{module_url, FsReader, LoaderOptions, ModuleLoader, SourceReader};
pub use registry::ModuleRegistry;
