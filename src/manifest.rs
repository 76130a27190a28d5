// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! File format shared by the packager (writer) and the loader (reader).
//!
//! Both the `<artifact>.deps` sidecars and the `searchpaths` file are UTF-8 text with one
//! entry per line.

/// Suffix appended to an artifact file name to name its dependency manifest.
pub const MANIFEST_SUFFIX: &str = ".deps";

/// Name of the aggregated search path file.
pub const SEARCH_PATHS_FILE: &str = "searchpaths";

/// Name of the manifest belonging to `file_name`.
#[must_use]
pub fn manifest_name(file_name: &str) -> String {
    format!("{file_name}{MANIFEST_SUFFIX}")
}

/// Join entries with newlines, without a trailing separator.
#[must_use]
pub fn render<S: AsRef<str>>(entries: &[S]) -> String {
    entries
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split manifest text into entries, skipping empty lines.
#[must_use]
pub fn parse(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_name() {
        assert_eq!(manifest_name("libA.so"), "libA.so.deps");
    }

    #[test]
    fn test_render_has_no_trailing_separator() {
        assert_eq!(render(&["libB.so.2.0.1", "libz.so.1"]), "libB.so.2.0.1\nlibz.so.1");
        assert_eq!(render::<&str>(&[]), "");
    }

    #[test]
    fn test_parse_skips_empty_lines() {
        assert_eq!(parse("a\n\nb\n"), vec!["a", "b"]);
        assert_eq!(parse("a\r\nb"), vec!["a", "b"]);
        assert!(parse("").is_empty());
    }
}
