//! macOS-specific foreground process detection using Cocoa/AppKit

use super::{ForegroundProcess, PlatformError};
use cocoa::base::{id, nil};
use objc::{class, msg_send, sel, sel_impl};

pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    unsafe {
        let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
        if workspace == nil {
            return Err(PlatformError::ForegroundProcess(
                "Failed to get shared workspace".to_string(),
            ));
        }

        let frontmost: id = msg_send![workspace, frontmostApplication];
        if frontmost == nil {
            return Err(PlatformError::ForegroundProcess(
                "No frontmost application".to_string(),
            ));
        }

        let pid: i32 = msg_send![frontmost, processIdentifier];

        // Executable name first, localized name for apps without a bundle executable
        let executable_url: id = msg_send![frontmost, executableURL];
        let mut name = if executable_url != nil {
            let component: id = msg_send![executable_url, lastPathComponent];
            nsstring_to_string(component)
        } else {
            String::new()
        };

        if name.is_empty() {
            let localized: id = msg_send![frontmost, localizedName];
            name = nsstring_to_string(localized);
        }

        if name.is_empty() {
            return Err(PlatformError::ForegroundProcess(format!(
                "Process {} has no name",
                pid
            )));
        }

        Ok(ForegroundProcess {
            pid: pid.max(0) as u32,
            name,
        })
    }
}

unsafe fn nsstring_to_string(nsstring: id) -> String {
    if nsstring == nil {
        return String::new();
    }
    let bytes: *const std::os::raw::c_char = msg_send![nsstring, UTF8String];
    if bytes.is_null() {
        return String::new();
    }
    std::ffi::CStr::from_ptr(bytes)
        .to_string_lossy()
        .into_owned()
}
