// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Formats and prints packaging summaries to the console.

use comfy_table::{Attribute, Cell, Table};

use super::PackagingReport;

/// Summarize the report to the console.
///
/// Prints one row per artifact with its manifest entries, followed by the search paths.
pub fn summarize_report(report: &PackagingReport) {
    println!("Directory: {}", report.directory().display());
    println!("Shared libraries: {}\n", report.artifacts().len());
    println!("{}\n", artifacts_table(report));
    if !report.search_paths().is_empty() {
        println!("{}\n", search_paths_table(report));
    }
    if report.failures() > 0 {
        println!(
            "Total: {} shared librar{} without manifest",
            report.failures(),
            if report.failures() == 1 { "y" } else { "ies" }
        );
    }
}

/// Create a table with the default preset styling.
fn default_table_preset() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL_CONDENSED)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
    table
}

fn artifacts_table(report: &PackagingReport) -> Table {
    let mut table = default_table_preset();
    table.set_header(vec![
        Cell::new("Shared Library").add_attribute(Attribute::Bold),
        Cell::new("Dependencies").add_attribute(Attribute::Bold),
        Cell::new("Excluded").add_attribute(Attribute::Bold),
    ]);
    for (name, artifact) in report.artifacts() {
        let dependencies = match artifact.error() {
            Some(error) => format!("ERROR: {error}"),
            None => artifact.dependencies().join("\n"),
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(dependencies),
            Cell::new(artifact.excluded().join(", ")),
        ]);
    }
    table
}

fn search_paths_table(report: &PackagingReport) -> Table {
    let mut table = default_table_preset();
    table.set_header(vec![
        Cell::new("Search Paths").add_attribute(Attribute::Bold)
    ]);
    for path in report.search_paths() {
        table.add_row(vec![Cell::new(path)]);
    }
    table
}
