// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Providers of embedded library payloads and their manifests.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Named resources the loader reads payloads, manifests and search paths from.
///
/// Locations are `/`-separated, e.g. `natives/linux-x86_64/libfoo.so.deps`.
pub trait ResourceProvider: Send + Sync {
    /// Read the resource at `location`.
    ///
    /// Returns `Ok(None)` if no such resource exists.
    ///
    /// # Errors
    /// Returns an error if the resource exists but cannot be read.
    fn read(&self, location: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Resources stored as files below a root directory, e.g. a packaged directory shipped
/// next to the application.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for DirectoryResources {
    fn read(&self, location: &str) -> io::Result<Option<Vec<u8>>> {
        let path = location
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment));
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Resources held in memory, typically compiled in with `include_bytes!`.
///
/// ```
/// use native_loader::loader::{MemoryResources, ResourceProvider};
///
/// let resources = MemoryResources::new()
///     .with("natives/libfoo.so", &b"\x7fELF"[..])
///     .with("natives/libfoo.so.deps", &b"libbar.so.1"[..]);
/// assert!(resources.read("natives/libfoo.so.deps").unwrap().is_some());
/// assert!(resources.read("natives/libbar.so.1").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    resources: HashMap<String, Cow<'static, [u8]>>,
}

impl MemoryResources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, replacing any previous one at the same location.
    #[must_use]
    pub fn with(mut self, location: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) -> Self {
        self.insert(location, bytes);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) {
        self.resources.insert(location.into(), bytes.into());
    }
}

impl ResourceProvider for MemoryResources {
    fn read(&self, location: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.resources.get(location).map(|bytes| bytes.to_vec()))
    }
}
