// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
mod args;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use args::Args;
use native_loader::packager::{
    summarize_report, ExclusionList, Introspection, Packager, PackagerConfig, PackagingReport,
};

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let packager = Packager::new(create_config(&args)?);

    let mut reports = Vec::new();
    let mut failed_directories = 0;
    for directory in &args.directories {
        match package_directory(&packager, directory) {
            Ok(report) => {
                summarize_report(&report);
                reports.push(report);
            }
            Err(e) => {
                error!("{e:#}");
                failed_directories += 1;
            }
        }
    }

    if let Some(dest) = &args.report {
        write_report_to_file(&reports, dest)?;
    }
    validate_reports(&reports, failed_directories)
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Build the packager configuration from the command line.
///
/// # Errors
/// Returns an error if the exclusions file cannot be read.
fn create_config(args: &Args) -> Result<PackagerConfig> {
    let mut exclusions = if args.no_default_exclusions {
        ExclusionList::empty()
    } else {
        ExclusionList::recommended()
    };
    if let Some(path) = &args.exclusions_file {
        exclusions.extend(ExclusionList::from_file(path)?);
    }
    exclusions.extend(ExclusionList::new(args.exclude.iter().cloned()));

    Ok(PackagerConfig {
        exclusions,
        introspection: if args.builtin {
            Introspection::Builtin
        } else {
            Introspection::Tool
        },
        timeout: Duration::from_secs(args.timeout),
        ..PackagerConfig::default()
    })
}

fn package_directory(packager: &Packager, directory: &Path) -> Result<PackagingReport> {
    info!("Packaging directory: {}", directory.display());
    packager
        .write_dependencies(directory)
        .with_context(|| format!("Failed to package directory: {}", directory.display()))
}

/// Write the reports to a file.
///
/// # Errors
/// Returns an error if the reports cannot be serialized to JSON or if the file cannot be created.
fn write_report_to_file(reports: &[PackagingReport], dest: &Path) -> Result<()> {
    info!("Writing report to file: {}", dest.display());
    let file = File::create(dest)
        .with_context(|| format!("Failed to create JSON output file: {}", dest.display()))?;
    serde_json::to_writer_pretty(file, reports)
        .with_context(|| format!("Failed to serialize report to JSON: {}", dest.display()))?;
    Ok(())
}

/// Fail if any directory or artifact could not be packaged.
fn validate_reports(reports: &[PackagingReport], failed_directories: usize) -> Result<()> {
    let failed_artifacts: usize = reports.iter().map(PackagingReport::failures).sum();
    if failed_directories > 0 || failed_artifacts > 0 {
        bail!(
            "Packaging failed: {failed_directories} director{} and {failed_artifacts} shared librar{} with errors",
            if failed_directories == 1 { "y" } else { "ies" },
            if failed_artifacts == 1 { "y" } else { "ies" },
        );
    }
    Ok(())
}
