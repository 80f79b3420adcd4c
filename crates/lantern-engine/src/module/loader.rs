//! Import resolution: registered native modules first, then source files
//!
//! The runtime calls the loader with the specifier of every import it cannot
//! satisfy from its own module cache. A specifier naming a registered native
//! module yields a fresh native module record. Anything else is read from
//! disk, compiled without being executed, and tagged with its import-meta
//! record (`url`, `main`).

use std::ffi::CString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lantern_sdk::{EngineContext, ImportMeta, ModuleHandle};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::registry::ModuleRegistry;
use crate::error::{LoaderError, LoaderResult};

// ============================================================================
// Configuration
// ============================================================================

/// Loader configuration
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Directory relative file specifiers resolve against.
    /// `None` means the process working directory.
    pub base_dir: Option<PathBuf>,
}

impl LoaderOptions {
    /// Resolve relative specifiers against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

// ============================================================================
// Source reading
// ============================================================================

/// Where module source text comes from
pub trait SourceReader: Send + Sync {
    /// Read the whole file at `path`
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads source files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Resolves import specifiers to module records
pub struct ModuleLoader<'r> {
    registry: &'r RwLock<ModuleRegistry>,
    reader: Box<dyn SourceReader>,
    options: LoaderOptions,
}

impl<'r> ModuleLoader<'r> {
    /// Create a loader over `registry`, reading files from disk
    pub fn new(registry: &'r RwLock<ModuleRegistry>) -> Self {
        Self {
            registry,
            reader: Box::new(FsReader),
            options: LoaderOptions::default(),
        }
    }

    /// Replace the configuration
    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the source reader
    pub fn with_reader(mut self, reader: impl SourceReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Current configuration
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Resolve `specifier` to a module record.
    ///
    /// # Resolution order
    /// 1. Registered native module: a new native record, no file access
    /// 2. Source file: read, compile, attach `{ url, main: false }`
    pub fn resolve(
        &self,
        ctx: &mut dyn EngineContext,
        specifier: &str,
    ) -> LoaderResult<ModuleHandle> {
        let registered = self.registry.read().lookup(specifier);
        if let Some(module) = registered {
            debug!(specifier, "resolved to native module");
            return Ok(module.create_module(ctx, specifier)?);
        }

        self.compile_file(ctx, specifier, false)
    }

    /// Loader hook form of [`resolve`](Self::resolve).
    ///
    /// Failures are logged and reported to the runtime as exceptions;
    /// the caller only sees `None`.
    pub fn load(&self, ctx: &mut dyn EngineContext, specifier: &str) -> Option<ModuleHandle> {
        match self.resolve(ctx, specifier) {
            Ok(module) => Some(module),
            Err(err) => {
                raise(ctx, &err);
                None
            }
        }
    }

    /// Compile the program entry module at `path` without running it.
    ///
    /// Same as the file path of [`resolve`](Self::resolve) except that the
    /// import-meta record says `main: true`. The registry is not consulted.
    pub fn load_entry(&self, ctx: &mut dyn EngineContext, path: &str) -> LoaderResult<ModuleHandle> {
        self.compile_file(ctx, path, true)
    }

    fn compile_file(
        &self,
        ctx: &mut dyn EngineContext,
        specifier: &str,
        main: bool,
    ) -> LoaderResult<ModuleHandle> {
        let path = self.source_path(specifier);
        let source = self.reader.read(&path).map_err(|source| LoaderError::Read {
            specifier: specifier.to_string(),
            source,
        })?;
        info!(path = %path.display(), bytes = source.len(), "read module source");

        let name = CString::new(specifier).map_err(|_| LoaderError::PathResolution {
            specifier: specifier.to_string(),
            reason: "specifier contains a NUL byte".to_string(),
        })?;
        let module = ctx
            .compile_module(&source, &name)
            .map_err(|source| LoaderError::Compile {
                specifier: specifier.to_string(),
                source,
            })?;

        let url = match module_url(specifier, self.options.base_dir.as_deref()) {
            Ok(url) => url,
            Err(err) => {
                ctx.discard_module(module);
                return Err(err);
            }
        };
        debug!(%url, main, "set import.meta");

        let meta = ImportMeta { url, main };
        if let Err(source) = ctx.set_import_meta(module, &meta) {
            ctx.discard_module(module);
            return Err(LoaderError::ImportMeta {
                url: meta.url,
                source,
            });
        }
        Ok(module)
    }

    fn source_path(&self, specifier: &str) -> PathBuf {
        let path = Path::new(specifier);
        match &self.options.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl std::fmt::Debug for ModuleLoader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Report a resolution failure through the runtime's exception channel
fn raise(ctx: &mut dyn EngineContext, err: &LoaderError) {
    warn!(%err, "module resolution failed");
    match err {
        LoaderError::Read { specifier, .. } => {
            ctx.throw_reference_error(&format!("could not load module filename '{specifier}'"));
        }
        LoaderError::PathResolution { .. } => {
            ctx.throw_type_error("Path resolution failure");
        }
        LoaderError::Binding(bind) => {
            ctx.throw_reference_error(&bind.to_string());
        }
        // The runtime raised these itself.
        LoaderError::Compile { .. } | LoaderError::ImportMeta { .. } => {}
    }
}

/// Canonical URL of a module specifier.
///
/// A specifier containing `:` is already a URL and is returned unchanged.
/// Anything else is a path: it is made absolute (relative to `base_dir` when
/// given), canonicalized if the file exists, and prefixed with `file://`.
pub fn module_url(specifier: &str, base_dir: Option<&Path>) -> LoaderResult<String> {
    if specifier.contains(':') {
        return Ok(specifier.to_string());
    }

    let path_error = |reason: String| LoaderError::PathResolution {
        specifier: specifier.to_string(),
        reason,
    };
    if specifier.is_empty() {
        return Err(path_error("empty specifier".to_string()));
    }

    let path = Path::new(specifier);
    let joined = match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    };
    let absolute = if joined.exists() {
        fs::canonicalize(&joined)
    } else {
        std::path::absolute(&joined)
    }
    .map_err(|e| path_error(e.to_string()))?;

    Ok(format!("file://{}", absolute.display()))
}
