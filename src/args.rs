// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "native-packager")]
#[command(version)]
#[command(about = "Writes dependency manifests for directories of shared libraries")]
pub(crate) struct Args {
    /// Directories containing the shared libraries to package.
    #[arg(required = true)]
    pub directories: Vec<PathBuf>,

    /// Additional exclusion pattern, e.g. `ssl*`. May be given multiple times.
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    #[arg(
        long,
        value_name = "FILE",
        long_help = "Path to a text file of exclusion patterns.\n\
                Each line contains one pattern matched against library short names.\n\
                Empty lines and lines starting with # are ignored."
    )]
    pub exclusions_file: Option<PathBuf>,

    /// Do not exclude the C/C++ runtime and OS libraries by default.
    #[arg(long)]
    pub no_default_exclusions: bool,

    /// Parse object files in-process instead of running ldd/objdump.
    #[arg(long)]
    pub builtin: bool,

    /// Timeout for a single ldd/objdump invocation.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Path to the file to write the packaging results in JSON format.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}
