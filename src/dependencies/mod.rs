// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Determines the libraries a shared-library artifact depends on.
//!
//! The default [`ToolInspector`] runs the platform introspection tool (`ldd` on POSIX systems,
//! `objdump -p` on Windows) and parses its output. [`ObjectInspector`] reads the object file
//! in-process instead.

mod object;
mod runner;

pub use object::ObjectInspector;
pub use runner::{CommandError, CommandRunner, ToolCommand, ToolRunner, DEFAULT_TOOL_TIMEOUT};

use path_clean::PathClean;
use regex::Regex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::naming::Platform;

static DLL_NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*DLL Name:\s*([^\s.\\/]+\.dll)\s*$").expect("objdump pattern is valid")
});

static LDD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s\\/]+) => (?:(\S+)\s\(0x[0-9a-f]+\)|not found)$")
        .expect("ldd pattern is valid")
});

/// Failure to determine the dependencies of one artifact. No partial result is kept.
#[derive(Debug, Error)]
#[error("Failed determining library dependencies of {path:?}")]
pub struct DependencyError {
    path: PathBuf,
    #[source]
    cause: DiscoveryCause,
}

/// Underlying reason for a [`DependencyError`].
#[derive(Debug, Error)]
pub enum DiscoveryCause {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Failed to read object file")]
    Read(#[source] io::Error),
    #[error("Failed to parse object file")]
    Parse(#[source] goblin::error::Error),
    #[error("Unsupported object format: {0}")]
    Unsupported(&'static str),
}

impl DependencyError {
    pub(crate) fn new(path: &Path, cause: impl Into<DiscoveryCause>) -> Self {
        Self {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn cause(&self) -> &DiscoveryCause {
        &self.cause
    }
}

/// Raw dependency names of one artifact, plus the directories where the build machine
/// resolved some of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    names: Vec<String>,
    hints: BTreeMap<String, String>,
}

impl Dependencies {
    #[must_use]
    pub fn new(names: Vec<String>, hints: BTreeMap<String, String>) -> Self {
        Self { names, hints }
    }

    /// Dependency names in the order the tool reported them.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Directory hints keyed by dependency name.
    #[must_use]
    pub fn hints(&self) -> &BTreeMap<String, String> {
        &self.hints
    }
}

/// Anything that can list the dependencies of a shared-library artifact.
pub trait DependencySource: Send + Sync {
    /// Determine the dependencies of the artifact at `artifact`.
    ///
    /// # Errors
    /// Returns an error if the dependencies cannot be determined.
    fn dependencies_of(&self, artifact: &Path) -> Result<Dependencies, DependencyError>;
}

/// Determines dependencies by running the platform introspection tool.
pub struct ToolInspector<R = CommandRunner> {
    platform: Platform,
    runner: R,
}

impl ToolInspector<CommandRunner> {
    #[must_use]
    pub fn new(platform: Platform, runner: CommandRunner) -> Self {
        Self { platform, runner }
    }
}

impl<R: ToolRunner> ToolInspector<R> {
    /// Use a custom runner, e.g. one returning canned output.
    #[must_use]
    pub fn with_runner(platform: Platform, runner: R) -> Self {
        Self { platform, runner }
    }

    /// The command used to inspect `artifact`.
    #[must_use]
    pub fn command_for(&self, artifact: &Path) -> ToolCommand {
        let artifact = std::path::absolute(artifact).unwrap_or_else(|_| artifact.to_path_buf());
        match self.platform {
            Platform::Windows => ToolCommand::new("objdump").arg("-p").arg(artifact),
            Platform::Posix => ToolCommand::new("ldd").arg(artifact),
        }
    }
}

impl<R: ToolRunner> DependencySource for ToolInspector<R> {
    fn dependencies_of(&self, artifact: &Path) -> Result<Dependencies, DependencyError> {
        let output = self
            .runner
            .run(&self.command_for(artifact))
            .map_err(|e| DependencyError::new(artifact, e))?;
        Ok(parse(&output, self.platform))
    }
}

/// Parse introspection tool output line by line.
pub(crate) fn parse(output: &str, platform: Platform) -> Dependencies {
    let pattern = match platform {
        Platform::Windows => &*DLL_NAME_LINE,
        Platform::Posix => &*LDD_LINE,
    };
    let mut dependencies = Dependencies::default();
    for captures in output.lines().filter_map(|line| pattern.captures(line)) {
        let Some(name) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if let Some(directory) = captures
            .get(2)
            .and_then(|resolved| hint_directory(name, resolved.as_str()))
        {
            dependencies.hints.insert(name.to_string(), directory);
        }
        dependencies.names.push(name.to_string());
    }
    dependencies
}

/// Directory part of `resolved` if it ends with `/<name>` (or `\<name>`).
fn hint_directory(name: &str, resolved: &str) -> Option<String> {
    let prefix = resolved.strip_suffix(name)?;
    if !(prefix.ends_with('/') || prefix.ends_with('\\')) {
        return None;
    }
    let directory = PathBuf::from(prefix).clean();
    Some(directory.to_string_lossy().into_owned())
}
