// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Binds shared libraries into the running process.

use libloading::Library;
use std::ffi::OsStr;
use std::path::Path;

use crate::naming::LibraryReference;

/// Error returned by a [`Binder`].
pub type BindError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Capability to bind a library into the current process.
pub trait Binder: Send + Sync {
    /// Bind a library by short name through the platform's own search rules.
    ///
    /// # Errors
    /// Returns an error if the platform cannot find or bind the library.
    fn bind_system(&self, library: &LibraryReference) -> Result<(), BindError>;

    /// Bind the library file at an absolute path.
    ///
    /// # Errors
    /// Returns an error if the platform rejects the file.
    fn bind_path(&self, path: &Path) -> Result<(), BindError>;
}

/// Binds through the platform dynamic loader (`dlopen`, `LoadLibraryW`).
///
/// Bound libraries are never unloaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBinder;

impl SystemBinder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(filename: &OsStr) -> Result<(), BindError> {
        // SAFETY: binding runs the library's initialisers. Callers only request libraries
        // they ship or explicitly depend on, the same trust as linking against them.
        let library = unsafe { Library::new(filename) }?;
        // Unloading is not supported: keep the library mapped for the life of the process.
        std::mem::forget(library);
        Ok(())
    }
}

impl Binder for SystemBinder {
    fn bind_system(&self, library: &LibraryReference) -> Result<(), BindError> {
        Self::open(&libloading::library_filename(library.short_name()))
    }

    fn bind_path(&self, path: &Path) -> Result<(), BindError> {
        Self::open(path.as_os_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_system_library() {
        let result =
            SystemBinder::new().bind_system(&LibraryReference::new("nope4711", "libnope4711.so"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_path() {
        let result = SystemBinder::new().bind_path(Path::new("/nonexistent/libnope4711.so"));
        assert!(result.is_err());
    }
}
