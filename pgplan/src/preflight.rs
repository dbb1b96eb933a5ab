//! Pre-flight checks for pgplan
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use object::{Object, ObjectSymbol};
use std::collections::HashSet;
use std::path::Path;

use crate::domain::{Pid, TracerError};
use crate::profiling::PLANNER_PROBES;

/// Minimum kernel version required for eBPF features used by pgplan
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks before eBPF loading
///
/// `dry_run` skips the privilege and kernel checks, which only matter when
/// programs are actually loaded.
pub fn run_preflight_checks(binary: &str, dry_run: bool) -> Result<()> {
    if !dry_run {
        check_privileges()?;
        check_kernel_version()?;
    }
    check_binary_exists(binary)?;
    check_probe_symbols(binary)?;
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    bail!(
        "Permission denied: pgplan requires root privileges to load eBPF programs.\n\n\
         Run with: sudo pgplan ..."
    );
}

/// Parse `major.minor` out of a `/proc/version` line
fn parse_kernel_release(version_str: &str) -> Option<(u32, u32)> {
    // "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2)?;
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts.next()?.chars().take_while(char::is_ascii_digit).collect();
    Some((major, minor.parse().ok()?))
}

/// Check if the kernel version is sufficient for eBPF features
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    let Some((major, minor)) = parse_kernel_release(&version_str) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {major}.{minor} is too old.\n\n\
             pgplan requires Linux {}.{} or newer for eBPF ring buffer support.",
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
        );
    }

    Ok(())
}

/// Check if the target binary exists and is readable
fn check_binary_exists(binary: &str) -> Result<()> {
    let path = Path::new(binary);
    if !path.exists() {
        bail!(
            "Binary not found: {binary}\n\n\
             Make sure the path is correct and the binary exists."
        );
    }
    if !path.is_file() {
        bail!(
            "Not a file: {binary}\n\n\
             --exec must point to the postgres executable, not a directory."
        );
    }
    Ok(())
}

/// Names from `wanted` absent from both symbol tables of an ELF image
///
/// # Errors
/// Returns an error if `data` is not a parsable object file
pub fn missing_symbols(data: &[u8], wanted: &[&str]) -> Result<Vec<String>> {
    let obj = object::File::parse(data).context("Not an object file")?;

    let mut present = HashSet::new();
    for symbol in obj.symbols().chain(obj.dynamic_symbols()) {
        if let Ok(name) = symbol.name() {
            if wanted.contains(&name) {
                present.insert(name.to_string());
            }
        }
    }

    Ok(wanted.iter().filter(|name| !present.contains(**name)).map(ToString::to_string).collect())
}

/// Check that the binary still carries the planner functions the uprobes
/// attach to
fn check_probe_symbols(binary: &str) -> Result<()> {
    let file_data =
        std::fs::read(binary).with_context(|| format!("Failed to read binary: {binary}"))?;

    let wanted: Vec<&str> = PLANNER_PROBES.iter().map(|p| p.symbol).collect();
    let missing = missing_symbols(&file_data, &wanted)
        .with_context(|| format!("Failed to parse {binary} as ELF"))?;

    if let Some(symbol) = missing.first() {
        return Err(TracerError::SymbolMissing {
            binary: binary.to_string(),
            symbol: symbol.clone(),
        })
        .context(
            "Make sure the PostgreSQL binary has debug symbols and the functions exist \
             (inlined or stripped builds cannot be traced)",
        );
    }
    Ok(())
}

/// Check if the target process exists
pub fn check_process_exists(pid: u32) -> Result<()> {
    let proc_path = format!("/proc/{pid}");
    if !Path::new(&proc_path).exists() {
        return Err(TracerError::ProcessNotFound(Pid(pid)))
            .with_context(|| format!("Is the backend still running? Check with: ps -p {pid}"));
    }
    Ok(())
}

/// Whether a process is still alive
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}
