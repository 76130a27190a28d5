// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Directory search used when the system loader cannot find a library by name.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Variable the platform dynamic loader consults for extra library directories.
pub const NATIVE_LIBRARY_PATH_VAR: Option<&str> = if cfg!(target_os = "macos") {
    Some("DYLD_LIBRARY_PATH")
} else if cfg!(windows) {
    None
} else {
    Some("LD_LIBRARY_PATH")
};

/// Directories searched when binding a library by short name fails.
///
/// The order is the native library path variable, then `PATH`, then the packaged search
/// paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchEnvironment {
    library_path: Option<OsString>,
    path: Option<OsString>,
}

impl SearchEnvironment {
    /// No environment directories at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the variables of the running process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            library_path: NATIVE_LIBRARY_PATH_VAR.and_then(env::var_os),
            path: env::var_os("PATH"),
        }
    }

    #[must_use]
    pub fn with_library_path(mut self, value: impl Into<OsString>) -> Self {
        self.library_path = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, value: impl Into<OsString>) -> Self {
        self.path = Some(value.into());
        self
    }

    /// Candidate directories in search order. Empty entries are skipped.
    pub(crate) fn directories(&self, packaged: &[String]) -> Vec<PathBuf> {
        [&self.library_path, &self.path]
            .into_iter()
            .flatten()
            .flat_map(env::split_paths)
            .chain(packaged.iter().map(PathBuf::from))
            .filter(|directory| !directory.as_os_str().is_empty())
            .collect()
    }
}

/// The first directory containing `file_name`.
pub(crate) fn locate(directories: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    directories
        .iter()
        .map(|directory| directory.join(file_name))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|metadata| metadata.is_file())
}
