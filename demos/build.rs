//! Build Script for the PETS demos
//!
//! Not required when using PETS as a library

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: CC0-1.0

use std::{env, error::Error, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    // put the memory layout in the linker search path, as the package root
    // isn't always searched
    fs::copy("memory.x", out_dir.join("memory.x"))?;
    println!("cargo::rerun-if-changed=memory.x");
    println!("cargo::rustc-link-search={}", out_dir.display());
    Ok(())
}

// End of File
