// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Loads packaged shared libraries together with their recorded dependencies.
//!
//! A library with a manifest has its dependencies loaded first, depth first and in manifest
//! order, then its payload is extracted into the [`LibraryCache`] and bound from there. A
//! library without a manifest is bound by short name, falling back to a directory search.

mod binder;
mod cache;
mod registry;
mod resources;
mod search;

pub use binder::{BindError, Binder, SystemBinder};
pub use cache::LibraryCache;
pub use registry::LoadedLibraries;
pub use resources::{DirectoryResources, MemoryResources, ResourceProvider};
pub use search::{SearchEnvironment, NATIVE_LIBRARY_PATH_VAR};

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manifest::{self, SEARCH_PATHS_FILE};
use crate::naming::{LibraryReference, Platform};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to bind native library {library} from {path:?}")]
    Bind {
        library: LibraryReference,
        path: PathBuf,
        #[source]
        source: BindError,
    },
    #[error("Failed to load native library {library}: not found in {} directories", searched.len())]
    NotFound {
        library: LibraryReference,
        searched: Vec<PathBuf>,
        #[source]
        source: BindError,
    },
    #[error("Resource {resource} of native library {library} is missing")]
    ResourceMissing {
        library: LibraryReference,
        resource: String,
    },
    #[error("Failed to read resource {resource} of native library {library}")]
    ResourceUnreadable {
        library: LibraryReference,
        resource: String,
        #[source]
        source: io::Error,
    },
    #[error("Library directory {path:?} is unavailable for {library}")]
    CacheUnavailable {
        library: LibraryReference,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to extract native library {library} to {path:?}")]
    ExtractionFailed {
        library: LibraryReference,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    /// The library the failing step was working on.
    #[must_use]
    pub fn library(&self) -> &LibraryReference {
        match self {
            Self::Bind { library, .. }
            | Self::NotFound { library, .. }
            | Self::ResourceMissing { library, .. }
            | Self::ResourceUnreadable { library, .. }
            | Self::CacheUnavailable { library, .. }
            | Self::ExtractionFailed { library, .. } => library,
        }
    }
}

/// Resource location of `name` below `base_path`.
fn resource_location(base_path: &str, name: &str) -> String {
    if base_path.is_empty() {
        name.to_string()
    } else if base_path.ends_with('/') {
        format!("{base_path}{name}")
    } else {
        format!("{base_path}/{name}")
    }
}

/// Library loader over a set of packaged resources.
///
/// A loader is `Sync` and can be shared between threads. Requests against the same
/// [`LoadedLibraries`] are serialised, so every library is bound at most once.
pub struct Loader<R, B = SystemBinder> {
    resources: R,
    binder: B,
    base_path: String,
    platform: Platform,
    registry: Arc<LoadedLibraries>,
    cache: Arc<LibraryCache>,
    environment: SearchEnvironment,
    search_paths: OnceLock<Vec<String>>,
}

impl<R: ResourceProvider> Loader<R, SystemBinder> {
    /// A loader binding through the platform dynamic loader, sharing the process-wide
    /// registry and the per-user cache.
    #[must_use]
    pub fn new(resources: R) -> Self {
        Self::with_binder(resources, SystemBinder::new())
    }
}

impl<R: ResourceProvider, B: Binder> Loader<R, B> {
    #[must_use]
    pub fn with_binder(resources: R, binder: B) -> Self {
        Self {
            resources,
            binder,
            base_path: String::new(),
            platform: Platform::current(),
            registry: LoadedLibraries::process_wide(),
            cache: LibraryCache::per_user(),
            environment: SearchEnvironment::from_process(),
            search_paths: OnceLock::new(),
        }
    }

    /// Prefix of every resource location, e.g. `natives/linux-x86_64`.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<LoadedLibraries>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<LibraryCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_search_environment(mut self, environment: SearchEnvironment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<LoadedLibraries> {
        &self.registry
    }

    #[must_use]
    pub fn binder(&self) -> &B {
        &self.binder
    }

    #[must_use]
    pub fn cache(&self) -> &LibraryCache {
        &self.cache
    }

    /// Load each named library in order. Stops at the first failure.
    ///
    /// # Errors
    /// Returns the [`LoadError`] of the first library that could not be loaded.
    pub fn load<I, S>(&self, names: I) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_for_each(|name| self.load_library(name.as_ref()))
    }

    /// Load one library by logical name, e.g. `foo`, `libfoo.so` or `foo.dll`.
    ///
    /// Loading an already loaded library does nothing. Dependencies bound before a failure
    /// stay registered.
    ///
    /// # Errors
    /// Returns an error naming the library whose resolution step failed.
    pub fn load_library(&self, name: &str) -> Result<(), LoadError> {
        let library = self.platform.to_platform_reference(name);
        let mut loaded = self.registry.lock();
        let mut resolving = Vec::new();
        self.resolve(&library, &mut loaded, &mut resolving)
    }

    fn resolve(
        &self,
        library: &LibraryReference,
        loaded: &mut HashSet<LibraryReference>,
        resolving: &mut Vec<LibraryReference>,
    ) -> Result<(), LoadError> {
        if loaded.contains(library) {
            return Ok(());
        }
        if resolving.contains(library) {
            warn!("Dependency cycle through {library}, skipping");
            return Ok(());
        }
        info!("Requesting load of {library}");

        match self.manifest(library)? {
            Some(dependencies) => {
                resolving.push(library.clone());
                let resolved = dependencies.iter().try_for_each(|dependency| {
                    let dependency = self.platform.to_platform_reference(dependency);
                    self.resolve(&dependency, loaded, resolving)
                });
                resolving.pop();
                resolved?;
                let path = self.extract(library)?;
                self.bind_path(library, &path)?;
            }
            None => self.bind_system(library)?,
        }

        loaded.insert(library.clone());
        Ok(())
    }

    fn manifest(&self, library: &LibraryReference) -> Result<Option<Vec<String>>, LoadError> {
        let resource = resource_location(
            &self.base_path,
            &manifest::manifest_name(library.file_name()),
        );
        match self.resources.read(&resource) {
            Ok(Some(bytes)) => Ok(Some(manifest::parse(&String::from_utf8_lossy(&bytes)))),
            Ok(None) => Ok(None),
            Err(source) => Err(LoadError::ResourceUnreadable {
                library: library.clone(),
                resource,
                source,
            }),
        }
    }

    fn extract(&self, library: &LibraryReference) -> Result<PathBuf, LoadError> {
        let resource = resource_location(&self.base_path, library.file_name());
        let bytes = match self.resources.read(&resource) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return Err(LoadError::ResourceMissing {
                    library: library.clone(),
                    resource,
                })
            }
            Err(source) => {
                return Err(LoadError::ResourceUnreadable {
                    library: library.clone(),
                    resource,
                    source,
                })
            }
        };

        let directory = self
            .cache
            .prepare()
            .map_err(|source| LoadError::CacheUnavailable {
                library: library.clone(),
                path: self.cache.root().to_path_buf(),
                source,
            })?;
        let target = directory.join(library.file_name());
        info!("Extracting {} to {}", library.file_name(), target.display());
        self.cache
            .store(library.file_name(), &bytes)
            .map_err(|source| LoadError::ExtractionFailed {
                library: library.clone(),
                path: target,
                source,
            })
    }

    fn bind_path(&self, library: &LibraryReference, path: &Path) -> Result<(), LoadError> {
        info!("Loading {} from {}", library.short_name(), path.display());
        self.binder
            .bind_path(path)
            .map_err(|source| LoadError::Bind {
                library: library.clone(),
                path: path.to_path_buf(),
                source,
            })
    }

    fn bind_system(&self, library: &LibraryReference) -> Result<(), LoadError> {
        info!("Loading {} via system", library.short_name());
        let Err(system_error) = self.binder.bind_system(library) else {
            return Ok(());
        };
        debug!("System bind of {library} failed: {system_error}, searching directories");

        let directories = self.environment.directories(self.search_paths());
        match search::locate(&directories, library.file_name()) {
            Some(path) => self.bind_path(library, &path),
            None => Err(LoadError::NotFound {
                library: library.clone(),
                searched: directories,
                source: system_error,
            }),
        }
    }

    /// Packaged search paths, read once per loader.
    fn search_paths(&self) -> &[String] {
        self.search_paths.get_or_init(|| {
            let resource = resource_location(&self.base_path, SEARCH_PATHS_FILE);
            match self.resources.read(&resource) {
                Ok(Some(bytes)) => manifest::parse(&String::from_utf8_lossy(&bytes)),
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!("Ignoring unreadable {resource}: {e}");
                    Vec::new()
                }
            }
        })
    }
}
