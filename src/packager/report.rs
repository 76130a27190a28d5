// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Outcome of one packaging run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

/// What was written for each artifact of a directory. Serialized as the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct PackagingReport {
    directory: PathBuf,
    artifacts: BTreeMap<String, ArtifactReport>,
    search_paths: Vec<String>,
}

/// Result for a single artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    dependencies: Vec<String>,
    excluded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PackagingReport {
    pub(crate) fn new(
        directory: &Path,
        artifacts: BTreeMap<String, ArtifactReport>,
        search_paths: Vec<String>,
    ) -> Self {
        Self {
            directory: directory.to_path_buf(),
            artifacts,
            search_paths,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reports keyed by artifact file name.
    #[must_use]
    pub fn artifacts(&self) -> &BTreeMap<String, ArtifactReport> {
        &self.artifacts
    }

    /// Directories written to the search path file, sorted.
    #[must_use]
    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    /// Number of artifacts whose manifest could not be produced.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.artifacts
            .values()
            .filter(|artifact| artifact.error.is_some())
            .count()
    }
}

impl ArtifactReport {
    pub(crate) fn written(dependencies: Vec<String>, excluded: Vec<String>) -> Self {
        Self {
            dependencies,
            excluded,
            error: None,
        }
    }

    pub(crate) fn failed(error: &dyn Error) -> Self {
        Self {
            error: Some(error_chain(error)),
            ..Self::default()
        }
    }

    /// Dependencies written to the manifest, already mapped to absolute names.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Raw dependency names dropped by the exclusion list.
    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Render an error and all of its sources on one line.
pub(crate) fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
