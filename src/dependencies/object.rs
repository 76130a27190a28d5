// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Reads dependencies straight from object files using the `goblin` crate.

use goblin::mach::Mach;
use goblin::Object;
use std::fs;
use std::path::Path;

use super::{Dependencies, DependencyError, DependencySource, DiscoveryCause};

/// Lists the libraries an object file declares as needed, without running external tools.
///
/// Only direct dependencies are reported (`DT_NEEDED` for ELF, the import table for PE, load
/// commands for Mach-O), and no resolution hints are produced since nothing is resolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectInspector;

impl ObjectInspector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DependencySource for ObjectInspector {
    fn dependencies_of(&self, artifact: &Path) -> Result<Dependencies, DependencyError> {
        let bytes = fs::read(artifact)
            .map_err(|e| DependencyError::new(artifact, DiscoveryCause::Read(e)))?;
        let object = Object::parse(&bytes)
            .map_err(|e| DependencyError::new(artifact, DiscoveryCause::Parse(e)))?;

        let names: Vec<String> = match object {
            Object::Elf(elf) => elf.libraries.iter().map(ToString::to_string).collect(),
            Object::PE(pe) => pe.libraries.iter().map(ToString::to_string).collect(),
            // goblin lists the binary itself as "self" in front of the real libraries.
            Object::Mach(Mach::Binary(macho)) => macho
                .libs
                .iter()
                .filter(|lib| **lib != "self")
                .map(ToString::to_string)
                .collect(),
            Object::Mach(Mach::Fat(_)) => {
                return Err(DependencyError::new(
                    artifact,
                    DiscoveryCause::Unsupported("fat Mach-O"),
                ))
            }
            Object::Archive(_) => {
                return Err(DependencyError::new(
                    artifact,
                    DiscoveryCause::Unsupported("static archive"),
                ))
            }
            _ => {
                return Err(DependencyError::new(
                    artifact,
                    DiscoveryCause::Unsupported("unknown"),
                ))
            }
        };
        Ok(Dependencies::new(names, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file() {
        let error = ObjectInspector::new()
            .dependencies_of(Path::new("/nonexistent/libfoo.so"))
            .unwrap_err();
        assert!(matches!(error.cause(), DiscoveryCause::Read(_)));
    }

    #[test]
    fn test_not_an_object_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "This is a text file, not a shared library.").unwrap();
        file.flush().unwrap();

        let result = ObjectInspector::new().dependencies_of(file.path());
        assert!(result.is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_reads_needed_entries_of_running_executable() {
        // Test binaries are dynamically linked against the C library on Linux.
        let executable = std::env::current_exe().unwrap();
        let dependencies = ObjectInspector::new().dependencies_of(&executable).unwrap();
        assert!(dependencies
            .names()
            .iter()
            .any(|name| name.starts_with("libc.so")));
        assert!(dependencies.hints().is_empty());
    }
}
