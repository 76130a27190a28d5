// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Writes dependency manifests for a directory of shared libraries.
//!
//! For every artifact `<name>` in the directory a `<name>.deps` file lists its dependencies
//! (excluded system libraries removed, local version aliases rewritten to the file on disk).
//! One `searchpaths` file collects the build-machine directories of dependencies that are not
//! shipped in the directory.

mod absolute_names;
mod artifacts;
mod console;
mod exclusions;
mod report;

pub use console::summarize_report;
pub use exclusions::ExclusionList;
pub use report::{ArtifactReport, PackagingReport};

use dashmap::DashSet;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::dependencies::{
    CommandRunner, DependencySource, ObjectInspector, ToolInspector, DEFAULT_TOOL_TIMEOUT,
};
use crate::manifest;
use crate::naming::Platform;
use absolute_names::AbsoluteNames;

/// Errors that can occur while packaging a directory.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("Not a directory: {path:?}")]
    NotADirectory { path: PathBuf },
    #[error("Failed to list directory: {path:?}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Failed to write manifest: {path:?}")]
    WriteManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write search paths: {path:?}")]
    WriteSearchPaths {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How dependencies are discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Introspection {
    /// Run `ldd` or `objdump -p`. Reports transitive dependencies and search path hints.
    #[default]
    Tool,
    /// Parse the object files in-process. Direct dependencies only, no hints.
    Builtin,
}

/// Packager settings.
#[derive(Debug, Clone)]
pub struct PackagerConfig {
    pub platform: Platform,
    pub exclusions: ExclusionList,
    pub introspection: Introspection,
    /// Upper bound for a single introspection command.
    pub timeout: Duration,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            exclusions: ExclusionList::recommended(),
            introspection: Introspection::default(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Produces manifests for directories of shared libraries.
pub struct Packager {
    platform: Platform,
    exclusions: ExclusionList,
    source: Box<dyn DependencySource>,
}

impl Packager {
    #[must_use]
    pub fn new(config: PackagerConfig) -> Self {
        let source: Box<dyn DependencySource> = match config.introspection {
            Introspection::Tool => Box::new(ToolInspector::new(
                config.platform,
                CommandRunner::new(config.timeout),
            )),
            Introspection::Builtin => Box::new(ObjectInspector::new()),
        };
        Self {
            platform: config.platform,
            exclusions: config.exclusions,
            source,
        }
    }

    /// Use a custom dependency source, e.g. a [`ToolInspector`] with canned output.
    #[must_use]
    pub fn with_source(
        platform: Platform,
        exclusions: ExclusionList,
        source: impl DependencySource + 'static,
    ) -> Self {
        Self {
            platform,
            exclusions,
            source: Box::new(source),
        }
    }

    /// Write one manifest per shared library in `directory`, plus the search path file.
    ///
    /// An artifact whose dependencies cannot be determined, or whose manifest cannot be
    /// written, is logged and recorded in the report; the remaining artifacts are still
    /// processed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed or the search path file cannot be
    /// written.
    pub fn write_dependencies(&self, directory: &Path) -> Result<PackagingReport, PackagerError> {
        let artifacts = artifacts::shared_libraries(directory, self.platform)?;
        let absolute_names =
            AbsoluteNames::new(artifacts.iter().filter_map(|path| file_name(path)));
        info!(
            "Packaging {} shared libraries in {}",
            artifacts.len(),
            directory.display()
        );

        let search_paths = DashSet::new();
        let reports: BTreeMap<String, ArtifactReport> = artifacts
            .par_iter()
            .filter_map(|artifact| {
                let name = file_name(artifact)?;
                let report = self.package_artifact(
                    directory,
                    artifact,
                    name,
                    &absolute_names,
                    &search_paths,
                );
                Some((name.to_string(), report))
            })
            .collect();

        let search_paths: Vec<String> = search_paths
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let path = directory.join(manifest::SEARCH_PATHS_FILE);
        fs::write(&path, manifest::render(&search_paths))
            .map_err(|e| PackagerError::WriteSearchPaths { path, source: e })?;

        Ok(PackagingReport::new(directory, reports, search_paths))
    }

    fn package_artifact(
        &self,
        directory: &Path,
        artifact: &Path,
        name: &str,
        absolute_names: &AbsoluteNames,
        search_paths: &DashSet<String>,
    ) -> ArtifactReport {
        let dependencies = match self.source.dependencies_of(artifact) {
            Ok(dependencies) => dependencies,
            Err(e) => {
                warn!("{}", report::error_chain(&e));
                return ArtifactReport::failed(&e);
            }
        };

        let (excluded, kept): (Vec<&String>, Vec<&String>) = dependencies
            .names()
            .iter()
            .partition(|name| self.exclusions.excludes(name));
        let written: Vec<String> = kept
            .into_iter()
            .map(|name| absolute_names.resolve(name).to_string())
            .collect();

        // Hints are only kept for dependencies that are not shipped in the directory.
        for (dependency, hint) in dependencies.hints() {
            if !directory.join(absolute_names.resolve(dependency)).exists() {
                search_paths.insert(hint.clone());
            }
        }

        let path = directory.join(manifest::manifest_name(name));
        if let Err(e) = fs::write(&path, manifest::render(&written)) {
            let error = PackagerError::WriteManifest { path, source: e };
            warn!("{}", report::error_chain(&error));
            return ArtifactReport::failed(&error);
        }

        info!(
            "Dependencies of {}: [{}]",
            artifact.display(),
            written.join(", ")
        );
        ArtifactReport::written(written, excluded.into_iter().cloned().collect())
    }
}

/// Write manifests for `directory` with the default configuration and the given exclusions.
///
/// # Errors
/// Returns an error if the directory cannot be listed or the search path file cannot be
/// written.
pub fn write_dependencies(
    directory: &Path,
    exclusions: ExclusionList,
) -> Result<PackagingReport, PackagerError> {
    Packager::new(PackagerConfig {
        exclusions,
        ..PackagerConfig::default()
    })
    .write_dependencies(directory)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::{CommandError, ToolCommand, ToolRunner};
    use tempfile::TempDir;

    /// Canned `ldd` output keyed by artifact file name.
    fn ldd(
        outputs: &'static [(&'static str, &'static str)],
    ) -> ToolInspector<impl ToolRunner> {
        let runner = move |command: &ToolCommand| -> Result<String, CommandError> {
            let artifact = Path::new(&command.args()[0]);
            let name = artifact.file_name().and_then(|n| n.to_str()).unwrap_or("");
            outputs
                .iter()
                .find(|(candidate, _)| *candidate == name)
                .map(|(_, output)| (*output).to_string())
                .ok_or_else(|| CommandError::ExitStatus {
                    command: command.to_string(),
                    code: 1,
                    stderr: "not a dynamic executable".to_string(),
                })
        };
        ToolInspector::with_runner(Platform::Posix, runner)
    }

    fn touch(dir: &TempDir, names: &[&str]) {
        for name in names {
            fs::write(dir.path().join(name), b"\x7fELF").unwrap();
        }
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_rewrites_to_absolute_names() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["libA.so", "libB.so.2.0.1"]);
        let source = ldd(&[
            (
                "libA.so",
                "\tlibB.so.2 => not found\n\tlibc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f0000000000)\n",
            ),
            (
                "libB.so.2.0.1",
                "\tlibz.so.1 => /usr/lib/libz.so.1 (0x00007f0000000000)\n\tlibm.so.6 => /lib/x86_64-linux-gnu/libm.so.6 (0x00007f0000000000)\n",
            ),
        ]);
        let packager = Packager::with_source(Platform::Posix, ExclusionList::recommended(), source);

        let report = packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(read(&dir, "libA.so.deps"), "libB.so.2.0.1");
        assert_eq!(read(&dir, "libB.so.2.0.1.deps"), "libz.so.1");
        assert_eq!(report.artifacts()["libA.so"].excluded(), &["libc.so.6"]);
        assert_eq!(report.failures(), 0);
    }

    #[test]
    fn test_search_paths_only_for_unshipped_dependencies() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["libA.so", "libB.so.2.0.1"]);
        let source = ldd(&[
            (
                "libA.so",
                "\tlibB.so.2 => /build/lib/libB.so.2 (0x00007f0000000000)\n\tlibz.so.1 => /usr/local/zlib/libz.so.1 (0x00007f0000000000)\n",
            ),
            ("libB.so.2.0.1", ""),
        ]);
        let packager = Packager::with_source(Platform::Posix, ExclusionList::recommended(), source);

        let report = packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(read(&dir, "searchpaths"), "/usr/local/zlib");
        assert_eq!(report.search_paths(), &["/usr/local/zlib"]);
        assert_eq!(read(&dir, "libB.so.2.0.1.deps"), "");
    }

    #[test]
    fn test_search_paths_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["libA.so", "libB.so"]);
        const OUTPUT: &str = "\tlibz.so.1 => /opt/z/libz.so.1 (0x00007f0000000000)\n";
        let source = ldd(&[("libA.so", OUTPUT), ("libB.so", OUTPUT)]);
        let packager = Packager::with_source(Platform::Posix, ExclusionList::empty(), source);

        packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(read(&dir, "searchpaths"), "/opt/z");
    }

    #[test]
    fn test_exclusion_patterns() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["foo.dll"]);
        let runner = |_: &ToolCommand| -> Result<String, CommandError> {
            Ok("\tDLL Name: api-ms-win-core-123.dll\n\tDLL Name: zlib1.dll\n\tDLL Name: KERNEL32.dll\n".to_string())
        };
        let source = ToolInspector::with_runner(Platform::Windows, runner);
        let packager = Packager::with_source(
            Platform::Windows,
            ExclusionList::new(["api-ms-win-*", "KERNEL32"]),
            source,
        );

        packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(read(&dir, "foo.dll.deps"), "zlib1.dll");
    }

    #[test]
    fn test_failed_artifact_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["libA.so", "libbroken.so"]);
        let source = ldd(&[("libA.so", "\tlibz.so.1 => not found\n")]);
        let packager = Packager::with_source(Platform::Posix, ExclusionList::empty(), source);

        let report = packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(report.failures(), 1);
        let error = report.artifacts()["libbroken.so"].error().unwrap();
        assert!(error.contains("Failed determining library dependencies"));
        assert!(!dir.path().join("libbroken.so.deps").exists());
        assert_eq!(read(&dir, "libA.so.deps"), "libz.so.1");
        assert!(dir.path().join("searchpaths").exists());
    }

    #[test]
    fn test_manifests_are_truncated_on_rerun() {
        let dir = TempDir::new().unwrap();
        touch(&dir, &["libA.so"]);
        fs::write(
            dir.path().join("libA.so.deps"),
            "stale-one\nstale-two\nstale-three",
        )
        .unwrap();
        let source = ldd(&[("libA.so", "\tlibz.so.1 => not found\n")]);
        let packager = Packager::with_source(Platform::Posix, ExclusionList::empty(), source);

        packager.write_dependencies(dir.path()).unwrap();

        assert_eq!(read(&dir, "libA.so.deps"), "libz.so.1");
    }

    #[test]
    fn test_missing_directory() {
        let packager = Packager::with_source(
            Platform::Posix,
            ExclusionList::empty(),
            ldd(&[]),
        );
        let result = packager.write_dependencies(Path::new("/nonexistent/packaging/dir"));
        assert!(matches!(result, Err(PackagerError::NotADirectory { .. })));
    }
}
