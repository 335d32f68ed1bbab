//! QEMU runner for the LM3S6965 board.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Output from one QEMU run.
pub struct QemuOutput {
    /// Semihosting output (stdout): progress and panic messages.
    pub semihosting: Vec<u8>,
    /// Everything the example transmitted on UART0.
    pub uart0: Vec<u8>,
}

/// Run an ELF in QEMU until it exits through semihosting.
///
/// UART0 is captured to a file, UART1 is left unconnected.
pub fn run_qemu(elf_path: &Path) -> Result<QemuOutput> {
    let uart0_file = NamedTempFile::new().context("Failed to create temp file for UART0")?;
    let uart0_path = uart0_file.path();

    let output = Command::new("qemu-system-arm")
        .arg("-cpu")
        .arg("cortex-m3")
        .arg("-machine")
        .arg("lm3s6965evb")
        .arg("-nographic")
        .arg("-monitor")
        .arg("none")
        .arg("-semihosting-config")
        .arg("enable=on,target=native")
        .arg("-serial")
        .arg(format!("file:{}", uart0_path.display()))
        .arg("-serial")
        .arg("null")
        .arg("-kernel")
        .arg(elf_path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run QEMU")?;

    if !output.status.success() {
        bail!(
            "QEMU exited with error: {:?}\n{}{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let uart0 = fs::read(uart0_path).context("Failed to read UART0 capture")?;

    Ok(QemuOutput {
        semihosting: output.stdout,
        uart0,
    })
}
