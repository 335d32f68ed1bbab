//! Run one example and check its UART0 output.

use std::fs;

use anyhow::{Context, Result};

use crate::build::{build_example, project_root};
use crate::qemu::run_qemu;

/// Options for running an example.
pub struct RunOptions {
    /// Print the captured output instead of comparing it (for `qemu`).
    pub verbose: bool,
    /// Update expected files instead of comparing (for `test --bless`).
    pub bless: bool,
    /// Build in release mode.
    pub release: bool,
}

/// Build and run `example`.
///
/// Returns `Ok(true)` if the test passed, `Ok(false)` if it failed. A run
/// that panics or exits with failure is an error.
pub fn run_example(example: &str, opts: &RunOptions) -> Result<bool> {
    println!("Building '{example}'...");
    let elf_path = build_example(example, opts.release)?;

    println!("Running in QEMU...");
    let output = run_qemu(&elf_path)?;
    let semihosting = String::from_utf8_lossy(&output.semihosting);
    let uart0 = String::from_utf8_lossy(&output.uart0);

    if opts.verbose {
        print!("{semihosting}");
        println!("--- uart0 ---");
        print!("{uart0}");
        println!("--- QEMU run end ---");
        return Ok(true);
    }

    let expected_path = project_root()
        .join("testsuite")
        .join("expected")
        .join(format!("{example}.expected"));
    let filename = format!("{example}.expected");

    if opts.bless {
        let status = match fs::read_to_string(&expected_path) {
            Ok(existing) if existing == uart0 => "No change",
            Ok(_) => {
                fs::write(&expected_path, uart0.as_bytes())?;
                "Updated"
            }
            Err(_) => {
                if let Some(dir) = expected_path.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(&expected_path, uart0.as_bytes())
                    .with_context(|| format!("Failed to write {filename}"))?;
                "Created"
            }
        };
        println!("  {filename}: {status}");
        return Ok(true);
    }

    let Ok(expected) = fs::read_to_string(&expected_path) else {
        println!("  No {filename}, run with --bless to create");
        println!("--- uart0 ---");
        print!("{uart0}");
        return Ok(false);
    };

    if uart0 == expected {
        println!("  PASS");
        Ok(true)
    } else {
        println!("  FAIL: UART0 output differs from expected");
        println!("--- expected ---");
        print!("{expected}");
        println!("--- uart0 ---");
        print!("{uart0}");
        println!("--- semihosting ---");
        print!("{semihosting}");
        Ok(false)
    }
}
