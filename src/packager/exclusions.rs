// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Glob patterns for dependencies that are assumed to be present on every target system.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::naming::name_matches_any;

/// Core runtime, threading and OS libraries excluded unless configured otherwise.
const RECOMMENDED: [&str; 10] = [
    "c",
    "stdc++",
    "gcc_s",
    "gcc_s_seh",
    "m",
    "pthread",
    "winpthread",
    "dl",
    "KERNEL32",
    "api-ms-win-*",
];

/// Ordered list of exclusion patterns, matched against library short names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionList {
    patterns: Vec<String>,
}

impl ExclusionList {
    /// An exclusion list that excludes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The C/C++ runtime, threading and OS libraries of the supported toolchains:
    /// `c`, `stdc++`, `gcc_s`, `gcc_s_seh`, `m`, `pthread`, `winpthread`, `dl`, `KERNEL32`
    /// and `api-ms-win-*`.
    #[must_use]
    pub fn recommended() -> Self {
        Self::new(RECOMMENDED)
    }

    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Read exclusion patterns from a file.
    ///
    /// Each line is one pattern. Empty lines and lines starting with `#` are ignored.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read exclusions file: {}", path.as_ref().display())
        })?;

        Ok(Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        ))
    }

    /// Append the patterns of `other`.
    pub fn extend(&mut self, other: Self) {
        self.patterns.extend(other.patterns);
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if a raw dependency name is excluded.
    #[must_use]
    pub fn excludes(&self, name: &str) -> bool {
        name_matches_any(name, &self.patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_excludes_nothing() {
        let exclusions = ExclusionList::empty();
        assert!(!exclusions.excludes("libc.so.6"));
    }

    #[test]
    fn test_recommended() {
        let exclusions = ExclusionList::recommended();
        assert!(exclusions.excludes("libc.so.6"));
        assert!(exclusions.excludes("libstdc++.so.6"));
        assert!(exclusions.excludes("libgcc_s_seh-1.dll"));
        assert!(exclusions.excludes("KERNEL32.dll"));
        assert!(exclusions.excludes("api-ms-win-core-123.dll"));
        assert!(!exclusions.excludes("libssl.so.3"));
        assert!(!exclusions.excludes("libcrypto.so.3"));
    }

    #[test]
    fn test_from_file_ignores_comments_and_empty_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# runtime").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  m  ").unwrap();
        writeln!(file, "\tapi-ms-win-*").unwrap();
        file.flush().unwrap();

        let exclusions = ExclusionList::from_file(file.path()).unwrap();
        assert_eq!(exclusions.patterns(), &["m", "api-ms-win-*"]);
        assert!(exclusions.excludes("libm.so.6"));
        assert!(exclusions.excludes("api-ms-win-core-123.dll"));
    }

    #[test]
    fn test_file_not_found() {
        let result = ExclusionList::from_file("/nonexistent/file.txt");
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_extend() {
        let mut exclusions = ExclusionList::new(["m"]);
        exclusions.extend(ExclusionList::new(["dl"]));
        assert_eq!(exclusions.patterns(), &["m", "dl"]);
    }
}
