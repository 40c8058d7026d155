//! Thin wrapper around the platform's dynamic loader.
//!
//! This is the only place that talks to `libloading`. Everything above it works
//! with [`ModuleHandle`], which hands out raw symbol addresses; turning those into
//! typed entry points is the job of [`crate::plugins::abi`].

use super::error::LoadError;
use libloading::Library;
use std::ffi::c_void;
use std::path::Path;
use tracing::debug;

/// An opened module. Dropping the handle closes the module.
pub trait ModuleHandle: Send + Sync {
    /// Look up an exported symbol by its exact name.
    ///
    /// Missing symbols are an expected outcome and yield `None`.
    fn resolve(&self, symbol: &str) -> Option<*mut c_void>;
}

/// Opens module files. The plugin manager goes through this seam so the
/// native loader can be swapped out.
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `path` into the process
    ///
    /// # Errors
    /// Returns a [`LoadError`] if the file is missing, malformed or rejected
    /// by the OS loader
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleHandle>, LoadError>;
}

/// Loader backed by `dlopen` / `LoadLibraryW`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

/// A module opened by [`NativeLoader`]
pub struct NativeModule {
    library: Library,
}

impl ModuleLoader for NativeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ModuleHandle>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::new(path, "file not found", None));
        }

        // Safety: loading a module runs its static initializers. Modules execute
        // with full host privilege; this is the accepted contract of the plugin system.
        let library = unsafe { Library::new(path) }.map_err(|err| {
            let os_code = std::error::Error::source(&err)
                .and_then(|source| source.downcast_ref::<std::io::Error>())
                .and_then(std::io::Error::raw_os_error);
            LoadError::new(path, err.to_string(), os_code)
        })?;

        debug!("Opened module '{}'", path.display());
        Ok(Box::new(NativeModule { library }))
    }
}

impl ModuleHandle for NativeModule {
    fn resolve(&self, symbol: &str) -> Option<*mut c_void> {
        // Safety: the symbol is only read as an address here. Its type is
        // asserted by the entry-point table.
        let address = unsafe {
            self.library
                .get::<*mut c_void>(symbol.as_bytes())
                .map(|sym| *sym)
                .ok()?
        };

        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}
