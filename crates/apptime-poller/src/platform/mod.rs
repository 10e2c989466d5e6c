//! Platform-specific functionality for foreground process detection

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to get foreground process: {0}")]
    ForegroundProcess(String),
    #[error("Unsupported platform")]
    Unsupported,
}

impl PlatformError {
    pub(crate) fn lookup(context: &str, err: impl std::fmt::Display) -> Self {
        PlatformError::ForegroundProcess(format!("{}: {}", context, err))
    }
}

/// The process that owns the focused window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundProcess {
    pub pid: u32,
    /// Executable name, e.g. `chrome.exe` on Windows or `firefox` on Linux
    pub name: String,
}

/// Get the process owning the currently focused window
#[cfg(target_os = "macos")]
pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    macos::foreground_process()
}

#[cfg(target_os = "windows")]
pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    windows::foreground_process()
}

#[cfg(target_os = "linux")]
pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    linux::foreground_process()
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    Err(PlatformError::Unsupported)
}
