// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Build script to generate test fixtures for the `native_loader` crate.
//!
//! Compiles two small shared libraries with gcc into `fixtures/`:
//! - `libnlfixture_b.so.1.0.0` with soname `libnlfixture_b.so.1`
//! - `libnlfixture_a.so`, linked against `libnlfixture_b.so.1`
//!
//! If gcc is not available, or the target is not Linux, the fixtures are skipped with a
//! warning. Tests will gracefully skip when fixtures are missing.

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

const LIB_B: &str = "libnlfixture_b.so.1.0.0";
const LIB_B_SONAME: &str = "libnlfixture_b.so.1";
const LIB_A: &str = "libnlfixture_a.so";

/// Check if a command is available in PATH.
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=fixtures/");

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("linux") {
        return;
    }
    if !command_exists("gcc") {
        println!("cargo:warning=gcc is missing. Shared library test fixtures will not be generated.");
        return;
    }

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let fixtures_dir = Path::new(&manifest_dir).join("fixtures");
    fs::create_dir_all(&fixtures_dir).expect("Failed to create fixtures directory");

    if fixtures_dir.join(LIB_A).exists() && fixtures_dir.join(LIB_B).exists() {
        return;
    }
    generate_library_fixtures(&fixtures_dir);
}

/// Compile the two fixture libraries, A depending on B.
fn generate_library_fixtures(fixtures_dir: &Path) {
    let temp_dir = env::temp_dir().join("native_loader_build");
    let _ = fs::remove_dir_all(&temp_dir);
    fs::create_dir_all(&temp_dir).expect("Failed to create temp directory");

    let b_source = r#"int nlfixture_b(void) {
    return 42;
}
"#;
    let a_source = r#"int nlfixture_b(void);

int nlfixture_a(void) {
    return nlfixture_b() + 1;
}
"#;
    fs::write(temp_dir.join("b.c"), b_source).expect("Failed to write b.c");
    fs::write(temp_dir.join("a.c"), a_source).expect("Failed to write a.c");

    let b_status = Command::new("gcc")
        .args([
            "-shared",
            "-fPIC",
            "-o",
            temp_dir.join(LIB_B).to_str().unwrap(),
            temp_dir.join("b.c").to_str().unwrap(),
            &format!("-Wl,-soname,{LIB_B_SONAME}"),
        ])
        .status();
    if b_status.map(|s| !s.success()).unwrap_or(true) {
        println!("cargo:warning=Failed to compile {LIB_B}, skipping fixture generation");
        let _ = fs::remove_dir_all(&temp_dir);
        return;
    }

    // Link against the exact file name so the soname ends up in DT_NEEDED.
    let a_status = Command::new("gcc")
        .args([
            "-shared",
            "-fPIC",
            "-o",
            temp_dir.join(LIB_A).to_str().unwrap(),
            temp_dir.join("a.c").to_str().unwrap(),
            &format!("-L{}", temp_dir.display()),
            &format!("-l:{LIB_B}"),
        ])
        .status();
    if a_status.map(|s| !s.success()).unwrap_or(true) {
        println!("cargo:warning=Failed to compile {LIB_A}, skipping fixture generation");
        let _ = fs::remove_dir_all(&temp_dir);
        return;
    }

    for name in [LIB_B, LIB_A] {
        if let Err(e) = fs::copy(temp_dir.join(name), fixtures_dir.join(name)) {
            println!("cargo:warning=Failed to copy {name} to fixtures: {e}");
        }
    }

    // Cleanup temp directory
    let _ = fs::remove_dir_all(&temp_dir);
}
