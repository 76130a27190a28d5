// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Library name normalization shared by the packager and the loader.
//!
//! A logical name such as `foo` becomes a platform file name (`libfoo.so` or `foo.dll`)
//! and a canonical short name (`foo`) used for lookups, deduplication and exclusion matching.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

const POSIX_PREFIX: &str = "lib";
const POSIX_EXTENSION: &str = ".so";
const WINDOWS_EXTENSION: &str = ".dll";

// Versioned shared objects: libfoo.so, libfoo.so.1, libfoo.so.1.2.3
static SHARED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\.so(\.[0-9]+)*$").expect("shared object pattern is valid")
});

/// Platform family deciding file naming conventions and introspection tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    Windows,
    Posix,
}

/// A library identified by its canonical short name and its platform file name.
///
/// Equality is by value: two references are equal iff both fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LibraryReference {
    short_name: String,
    file_name: String,
}

impl LibraryReference {
    #[must_use]
    pub fn new(short_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            file_name: file_name.into(),
        }
    }

    /// Platform independent identifier, used for system binding.
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Platform specific artifact name, used for resources and the cache directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for LibraryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.short_name, self.file_name)
    }
}

impl Platform {
    /// The platform family this crate was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Map a logical library name to a platform reference.
    ///
    /// A name that already carries an extension is treated as a concrete file name and is not
    /// decorated. Otherwise `.dll` is appended on Windows and `lib<name>.so` is used elsewhere.
    #[must_use]
    pub fn to_platform_reference(self, logical_name: &str) -> LibraryReference {
        let (stem, has_extension) = match logical_name.find('.') {
            Some(dot) => (&logical_name[..dot], true),
            None => (logical_name, false),
        };
        match self {
            Self::Windows => {
                let file_name = if has_extension {
                    logical_name.to_string()
                } else {
                    format!("{logical_name}{WINDOWS_EXTENSION}")
                };
                LibraryReference::new(stem, file_name)
            }
            Self::Posix => {
                let short_name = stem.strip_prefix(POSIX_PREFIX).unwrap_or(stem);
                let file_name = if has_extension {
                    logical_name.to_string()
                } else {
                    format!("{POSIX_PREFIX}{logical_name}{POSIX_EXTENSION}")
                };
                LibraryReference::new(short_name, file_name)
            }
        }
    }

    /// Check whether a file name looks like a shared library on this platform.
    #[must_use]
    pub fn is_shared_library(self, file_name: &str) -> bool {
        match self {
            Self::Windows => file_name.ends_with(WINDOWS_EXTENSION),
            Self::Posix => SHARED_OBJECT.is_match(file_name),
        }
    }
}

/// Canonical short name of a library file name.
///
/// Cuts at the first `.`, strips a `lib` prefix and then strips a trailing `-<digits>`
/// version suffix. Any other hyphenated suffix is kept.
///
/// ```
/// use native_loader::naming::short_name_of;
///
/// assert_eq!(short_name_of("libstdc++-6.dll"), "stdc++");
/// assert_eq!(short_name_of("libssl.so.3"), "ssl");
/// assert_eq!(short_name_of("api-ms-win-core-rtl"), "api-ms-win-core-rtl");
/// ```
#[must_use]
pub fn short_name_of(name: &str) -> String {
    let stem = name.split('.').next().unwrap_or(name);
    let stem = stem.strip_prefix(POSIX_PREFIX).unwrap_or(stem);
    remove_version_number(stem).to_string()
}

fn remove_version_number(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((base, number))
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => name,
    }
}

/// Match a library name against a glob pattern where `*` stands for any run of characters.
///
/// Matching is anchored and done against the short name, not the raw file name.
#[must_use]
pub fn name_matches(name: &str, pattern: &str) -> bool {
    let short_name = short_name_of(name);
    if !pattern.contains('*') {
        return pattern == short_name;
    }
    let expression = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{expression}$")).is_ok_and(|re| re.is_match(&short_name))
}

/// Check a library name against a list of glob patterns.
#[must_use]
pub fn name_matches_any<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|pattern| name_matches(name, pattern.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_reference_decorates_bare_name() {
        let reference = Platform::Posix.to_platform_reference("foo");
        assert_eq!(reference.short_name(), "foo");
        assert_eq!(reference.file_name(), "libfoo.so");
    }

    #[test]
    fn test_posix_reference_keeps_concrete_file_name() {
        let reference = Platform::Posix.to_platform_reference("libfoo.so.1.2");
        assert_eq!(reference.short_name(), "foo");
        assert_eq!(reference.file_name(), "libfoo.so.1.2");
    }

    #[test]
    fn test_windows_reference() {
        let bare = Platform::Windows.to_platform_reference("foo");
        assert_eq!(bare, LibraryReference::new("foo", "foo.dll"));

        // No prefix stripping on Windows.
        let concrete = Platform::Windows.to_platform_reference("libfoo-2.dll");
        assert_eq!(concrete, LibraryReference::new("libfoo-2", "libfoo-2.dll"));
    }

    #[test]
    fn test_reference_is_idempotent() {
        for platform in [Platform::Posix, Platform::Windows] {
            for name in ["foo", "libfoo", "libfoo.so.1", "foo.dll", "a.b.c"] {
                assert_eq!(
                    platform.to_platform_reference(name),
                    platform.to_platform_reference(name)
                );
            }
        }
    }

    #[test]
    fn test_short_name_uses_first_dot() {
        assert_eq!(short_name_of("libfoo.so.1.2.3"), "foo");
        assert_eq!(short_name_of("libfoo-bar.so"), "foo-bar");
        assert_eq!(short_name_of("foo.1-2"), "foo");
    }

    #[test]
    fn test_short_name_strips_numeric_version() {
        assert_eq!(short_name_of("libgcc_s_seh-1.dll"), "gcc_s_seh");
        assert_eq!(short_name_of("api-ms-win-core-123.dll"), "api-ms-win-core");
        assert_eq!(short_name_of("foo-"), "foo-");
        assert_eq!(short_name_of("foo-1a"), "foo-1a");
    }

    #[test]
    fn test_short_name_unchanged_without_decoration() {
        assert_eq!(short_name_of("zlib1"), "zlib1");
        assert_eq!(short_name_of("KERNEL32"), "KERNEL32");
    }

    #[test]
    fn test_name_matches_exact() {
        assert!(name_matches("libc.so.6", "c"));
        assert!(name_matches("libstdc++.so.6", "stdc++"));
        assert!(!name_matches("libcrypto.so.3", "c"));
    }

    #[test]
    fn test_name_matches_wildcard() {
        assert!(name_matches("api-ms-win-core-123.dll", "api-ms-win-*"));
        assert!(name_matches("api-ms-win-crt-runtime-l1-1-0.dll", "api-ms-win-*"));
        assert!(!name_matches("kernel32.dll", "api-ms-win-*"));
        // Other regex meta characters are literal.
        assert!(!name_matches("libfooxbar.so", "foo.bar*"));
    }

    #[test]
    fn test_name_matches_any() {
        let patterns = ["m", "pthread", "api-ms-win-*"];
        assert!(name_matches_any("libpthread.so.0", &patterns));
        assert!(!name_matches_any("libssl.so.3", &patterns));
        assert!(!name_matches_any::<&str>("libm.so.6", &[]));
    }

    #[test]
    fn test_is_shared_library() {
        assert!(Platform::Posix.is_shared_library("libfoo.so"));
        assert!(Platform::Posix.is_shared_library("libfoo.so.1.2.3"));
        assert!(!Platform::Posix.is_shared_library("libfoo.so.deps"));
        assert!(!Platform::Posix.is_shared_library("libfoo.so.1a"));
        assert!(Platform::Windows.is_shared_library("foo.dll"));
        assert!(!Platform::Windows.is_shared_library("foo.dll.deps"));
    }
}
