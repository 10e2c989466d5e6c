//! Windows-specific foreground process detection

use super::{ForegroundProcess, PlatformError};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use windows::Win32::Foundation::CloseHandle;
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.0 == 0 {
            return Err(PlatformError::ForegroundProcess(
                "No foreground window".to_string(),
            ));
        }

        let mut process_id = 0u32;
        GetWindowThreadProcessId(hwnd, Some(&mut process_id));
        if process_id == 0 {
            return Err(PlatformError::ForegroundProcess(
                "Window has no owning process".to_string(),
            ));
        }

        // Fails when the process exited after the window lookup or is elevated
        let name = process_name(process_id).ok_or_else(|| {
            PlatformError::ForegroundProcess(format!("Cannot query process {}", process_id))
        })?;

        Ok(ForegroundProcess {
            pid: process_id,
            name,
        })
    }
}

fn process_name(process_id: u32) -> Option<String> {
    use windows::Win32::System::ProcessStatus::K32GetModuleBaseNameW;
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ};

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, process_id).ok()?;

        let mut name_buf = [0u16; 260];
        let len = K32GetModuleBaseNameW(handle, None, &mut name_buf);
        let _ = CloseHandle(handle);

        if len > 0 {
            Some(
                OsString::from_wide(&name_buf[..len as usize])
                    .to_string_lossy()
                    .into_owned(),
            )
        } else {
            None
        }
    }
}
