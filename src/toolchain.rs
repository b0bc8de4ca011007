//! Host toolchain probing.
//!
//! Shells out to `clang --version` and infers the host operating system
//! from the target triple in the banner.

use std::fmt;
use std::io;
use std::process::Command;
use tracing::info;

/// Operating systems the probe can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Windows,
    Linux,
    Macos,
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Windows => write!(f, "Windows"),
            HostOs::Linux => write!(f, "Linux"),
            HostOs::Macos => write!(f, "macOS"),
        }
    }
}

/// Probe the toolchain and log the detected operating system.
pub fn run() -> io::Result<()> {
    info!("Searching for clang");
    let banner = clang_banner()?;

    let os = classify(&banner).ok_or_else(|| {
        io::Error::new(io::ErrorKind::Unsupported, "no supported system found")
    })?;

    info!("Running in {os}");
    Ok(())
}

/// Capture the version banner of the clang on PATH.
fn clang_banner() -> io::Result<String> {
    let output = Command::new("clang").arg("--version").output().map_err(|e| {
        io::Error::new(
            e.kind(),
            "clang not found in path, please install clang from \"https://clang.llvm.org/\"",
        )
    })?;

    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "clang --version exited with failure",
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Classify the banner by its target triple.
///
/// The first line must mention `clang version`; the `Target:` line then
/// names the triple, e.g. `Target: x86_64-unknown-linux-gnu`.
fn classify(banner: &str) -> Option<HostOs> {
    let mut lines = banner.lines();
    let first = lines.next()?;
    if !first.contains("clang version") {
        return None;
    }

    let target = lines.find(|line| line.trim_start().starts_with("Target:"))?;
    if target.contains("windows") {
        Some(HostOs::Windows)
    } else if target.contains("linux") {
        Some(HostOs::Linux)
    } else if target.contains("apple") {
        Some(HostOs::Macos)
    } else {
        None
    }
}
