//! Pre-flight checks for sendlat
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};

use crate::domain::Pid;

/// Minimum kernel version required: BPF ring buffer support landed in 5.8.
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks before eBPF loading
pub fn run_preflight_checks() -> Result<()> {
    check_privileges()?;
    check_kernel_version()?;
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // Not root - CAP_BPF and CAP_PERFMON would also do on 5.8+, but
    // capability inspection needs extra dependencies, so require root.
    bail!(
        "Permission denied: sendlat requires root privileges to load eBPF programs.\n\n\
         Run with: sudo sendlat ..."
    );
}

/// Check if the kernel version is sufficient for eBPF features
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // Parse version like "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some((major, minor)) = parse_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             sendlat requires Linux {}.{} or newer for eBPF ring buffer support.\n\
             Current kernel: {}",
            major,
            minor,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
            release
        );
    }

    Ok(())
}

/// Check that the target process is alive before attaching
pub fn check_process_exists(pid: Pid) -> Result<()> {
    if !std::path::Path::new(&format!("/proc/{pid}")).exists() {
        bail!(
            "Process {pid} not found.\n\n\
             Check running processes with: ps -p {pid}"
        );
    }
    Ok(())
}

fn parse_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_release() {
        assert_eq!(parse_release("6.1.0-arch1-1"), Some((6, 1)));
    }

    #[test]
    fn parses_minor_with_suffix() {
        assert_eq!(parse_release("5.15rc2"), Some((5, 15)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_release("unknown"), None);
    }
}
