// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Directory that extracted libraries are bound from.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tempfile::NamedTempFile;

static PER_USER: LazyLock<Arc<LibraryCache>> =
    LazyLock::new(|| Arc::new(LibraryCache::at(default_root())));

/// A flat directory of extracted libraries, created on first use.
///
/// The default location is `~/.native-loader/libraries`, or
/// `<temp>/native-loader/libraries` when there is no home directory. Files are overwritten on
/// every extraction.
#[derive(Debug)]
pub struct LibraryCache {
    root: PathBuf,
    created: Mutex<bool>,
}

impl LibraryCache {
    /// A cache rooted at `root`. Nothing is created until the first extraction.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            created: Mutex::new(false),
        }
    }

    /// The shared per-user cache.
    #[must_use]
    pub fn per_user() -> Arc<Self> {
        Arc::clone(&PER_USER)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed and check that it is writable.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or no file can be created in it.
    pub fn prepare(&self) -> io::Result<&Path> {
        let mut created = self.created.lock().unwrap_or_else(PoisonError::into_inner);
        if !*created {
            fs::create_dir_all(&self.root)?;
            if !self.root.is_dir() {
                return Err(io::Error::other(format!(
                    "Not a directory: {}",
                    self.root.display()
                )));
            }
            NamedTempFile::new_in(&self.root).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("Library directory is not writable: {}: {e}", self.root.display()),
                )
            })?;
            *created = true;
        }
        Ok(&self.root)
    }

    /// Write `bytes` to `<root>/<file_name>`, replacing any previous file.
    ///
    /// The bytes go to a temporary file in the same directory first and are renamed into
    /// place, so other processes never see a partially written library.
    ///
    /// # Errors
    /// Returns an error if writing or renaming fails.
    pub fn store(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let directory = self.prepare()?;
        let mut file = NamedTempFile::new_in(directory)?;
        file.write_all(bytes)?;
        file.flush()?;
        let target = directory.join(file_name);
        file.persist(&target).map_err(|e| e.error)?;
        Ok(target)
    }
}

fn default_root() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".native-loader").join("libraries"),
        None => env::temp_dir().join("native-loader").join("libraries"),
    }
}
