// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Packaging and loading of native shared libraries together with their dependencies.
//!
//! This crate provides functionality to:
//! - Discover the dependencies of the shared libraries in a directory (`ldd`, `objdump -p` or
//!   in-process object parsing)
//! - Write a `.deps` manifest per library and a `searchpaths` file for the directory
//! - Load a packaged library at runtime, dependencies first, from an extraction cache
//! - Fall back to the system loader and directory search for unpackaged libraries

pub mod dependencies;
pub mod loader;
pub mod manifest;
pub mod naming;
pub mod packager;

// Re-export key types for convenience
pub use loader::{LoadError, LoadedLibraries, Loader};
pub use naming::{LibraryReference, Platform};
pub use packager::{ExclusionList, Packager, PackagerConfig, PackagingReport};
