// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Maps version aliases of a library to the file actually present on disk.

use std::collections::HashMap;

/// Alias to absolute name mapping for one directory.
///
/// `libfoo.so.1.2.3` on disk makes `libfoo.so.1.2`, `libfoo.so.1` and `libfoo.so` resolve to
/// `libfoo.so.1.2.3`. Longer names are registered first, so the most specific file wins.
#[derive(Debug, Default)]
pub(crate) struct AbsoluteNames {
    names: HashMap<String, String>,
}

impl AbsoluteNames {
    pub(crate) fn new<'a>(file_names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut file_names: Vec<&str> = file_names.into_iter().collect();
        file_names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut mapping = Self::default();
        for file_name in file_names {
            mapping.register(file_name);
        }
        mapping
    }

    fn register(&mut self, absolute: &str) {
        let mut alias = absolute;
        loop {
            self.names
                .entry(alias.to_string())
                .or_insert_with(|| absolute.to_string());
            match alias.rsplit_once('.') {
                Some((base, version))
                    if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    alias = base;
                }
                _ => break,
            }
        }
    }

    /// The absolute name for `name`, or `name` itself if no local file matches.
    pub(crate) fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.names.get(name).map_or(name, String::as_str)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.names.len()
    }
}
