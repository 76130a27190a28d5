// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Set of libraries already bound into the process.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use crate::naming::LibraryReference;

static PROCESS_WIDE: LazyLock<Arc<LoadedLibraries>> =
    LazyLock::new(|| Arc::new(LoadedLibraries::new()));

/// Libraries that were bound successfully. Entries are never removed.
///
/// Loaders sharing one registry never bind the same reference twice. Binding is a process
/// global operation, so applications normally share [`LoadedLibraries::process_wide`];
/// tests create isolated registries with [`LoadedLibraries::new`].
#[derive(Debug, Default)]
pub struct LoadedLibraries {
    loaded: Mutex<HashSet<LibraryReference>>,
}

impl LoadedLibraries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every loader of this process that asks for it.
    #[must_use]
    pub fn process_wide() -> Arc<Self> {
        Arc::clone(&PROCESS_WIDE)
    }

    #[must_use]
    pub fn contains(&self, library: &LibraryReference) -> bool {
        self.lock().contains(library)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Exclusive access for the duration of one load request.
    pub(crate) fn lock(&self) -> MutexGuard<'_, HashSet<LibraryReference>> {
        // The set stays consistent even if a holder panicked: entries are only inserted.
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = LoadedLibraries::new();
        assert!(registry.is_empty());
        assert!(!registry.contains(&LibraryReference::new("foo", "libfoo.so")));
    }

    #[test]
    fn test_membership_is_by_value() {
        let registry = LoadedLibraries::new();
        registry
            .lock()
            .insert(LibraryReference::new("foo", "libfoo.so"));
        assert!(registry.contains(&LibraryReference::new("foo", "libfoo.so")));
        assert!(!registry.contains(&LibraryReference::new("foo", "libfoo.so.1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_process_wide_registry_is_shared() {
        assert!(Arc::ptr_eq(
            &LoadedLibraries::process_wide(),
            &LoadedLibraries::process_wide()
        ));
    }
}
