// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Finds the shared-library artifacts of a packaging directory.

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use super::PackagerError;
use crate::naming::Platform;

/// Shared libraries directly inside `directory`, sorted by file name.
///
/// Symlinks count when they point at a regular file, so `libfoo.so -> libfoo.so.1.2.3` is an
/// artifact of its own. Entries that cannot be inspected, such as dangling symlinks, are
/// skipped with a warning.
///
/// # Errors
/// Returns an error if `directory` is not a directory or cannot be listed.
pub(crate) fn shared_libraries(
    directory: &Path,
    platform: Platform,
) -> Result<Vec<PathBuf>, PackagerError> {
    if !directory.is_dir() {
        return Err(PackagerError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let mut artifacts = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(PackagerError::ListFailed {
                    path: directory.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        let is_library = entry
            .file_name()
            .to_str()
            .is_some_and(|name| platform.is_shared_library(name));
        if entry.file_type().is_file() && is_library {
            artifacts.push(entry.into_path());
        }
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(ToString::to_string))
            .collect()
    }

    #[test]
    fn test_lists_posix_libraries() {
        let dir = TempDir::new().unwrap();
        for name in [
            "libA.so",
            "libB.so.2.0.1",
            "libA.so.deps",
            "searchpaths",
            "readme.txt",
            "foo.dll",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("libdir.so")).unwrap();
        fs::write(dir.path().join("libdir.so").join("libnested.so"), b"").unwrap();

        let artifacts = shared_libraries(dir.path(), Platform::Posix).unwrap();
        assert_eq!(file_names(&artifacts), vec!["libA.so", "libB.so.2.0.1"]);
    }

    #[test]
    fn test_lists_windows_libraries() {
        let dir = TempDir::new().unwrap();
        for name in ["foo.dll", "foo.dll.deps", "libbar.so"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let artifacts = shared_libraries(dir.path(), Platform::Windows).unwrap();
        assert_eq!(file_names(&artifacts), vec!["foo.dll"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_library_is_listed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("libfoo.so.1.2.3"), b"").unwrap();
        std::os::unix::fs::symlink("libfoo.so.1.2.3", dir.path().join("libfoo.so")).unwrap();

        let artifacts = shared_libraries(dir.path(), Platform::Posix).unwrap();
        assert_eq!(file_names(&artifacts), vec!["libfoo.so", "libfoo.so.1.2.3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("libA.so"), b"").unwrap();
        std::os::unix::fs::symlink("missing.txt", dir.path().join("README.link")).unwrap();
        std::os::unix::fs::symlink("libB.so.1", dir.path().join("libB.so")).unwrap();

        let artifacts = shared_libraries(dir.path(), Platform::Posix).unwrap();
        assert_eq!(file_names(&artifacts), vec!["libA.so"]);
    }

    #[test]
    fn test_not_a_directory() {
        let result = shared_libraries(Path::new("/nonexistent/dir"), Platform::Posix);
        assert!(matches!(result, Err(PackagerError::NotADirectory { .. })));
    }
}
