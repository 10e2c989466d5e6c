//! Linux-specific foreground process detection using X11

use super::{ForegroundProcess, PlatformError};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

pub fn foreground_process() -> Result<ForegroundProcess, PlatformError> {
    let (conn, screen_num) = RustConnection::connect(None)
        .map_err(|e| PlatformError::lookup("X11 connection failed", e))?;

    let root = conn.setup().roots[screen_num].root;

    let active_window_atom = intern_atom(&conn, b"_NET_ACTIVE_WINDOW")?;
    let active_window = read_u32(&conn, root, active_window_atom, AtomEnum::WINDOW.into())?
        .filter(|w| *w != 0)
        .ok_or_else(|| PlatformError::ForegroundProcess("No active window".to_string()))?;

    // Prefer the owning process name; not every client sets _NET_WM_PID
    let pid_atom = intern_atom(&conn, b"_NET_WM_PID")?;
    if let Some(pid) = read_u32(&conn, active_window, pid_atom, AtomEnum::CARDINAL.into())? {
        if let Ok(comm) = std::fs::read_to_string(format!("/proc/{}/comm", pid)) {
            let name = comm.trim();
            if !name.is_empty() {
                return Ok(ForegroundProcess {
                    pid,
                    name: name.to_string(),
                });
            }
        }
    }

    // WM_CLASS contains two null-terminated strings: instance name and class name
    let class_reply = conn
        .get_property(false, active_window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
        .map_err(|e| PlatformError::lookup("Failed to get property", e))?
        .reply()
        .map_err(|e| PlatformError::lookup("Failed to get property reply", e))?;

    let class_str = String::from_utf8_lossy(&class_reply.value);
    let name = class_str
        .split('\0')
        .filter(|s| !s.is_empty())
        .last()
        .ok_or_else(|| PlatformError::ForegroundProcess("Window has no WM_CLASS".to_string()))?
        .to_string();

    Ok(ForegroundProcess { pid: 0, name })
}

fn intern_atom(conn: &RustConnection, name: &[u8]) -> Result<Atom, PlatformError> {
    conn.intern_atom(false, name)
        .map_err(|e| PlatformError::lookup("Failed to intern atom", e))?
        .reply()
        .map(|reply| reply.atom)
        .map_err(|e| PlatformError::lookup("Failed to get atom reply", e))
}

fn read_u32(
    conn: &RustConnection,
    window: Window,
    property: Atom,
    type_: Atom,
) -> Result<Option<u32>, PlatformError> {
    let reply = conn
        .get_property(false, window, property, type_, 0, 1)
        .map_err(|e| PlatformError::lookup("Failed to get property", e))?
        .reply()
        .map_err(|e| PlatformError::lookup("Failed to get property reply", e))?;

    Ok(reply.value32().and_then(|mut values| values.next()))
}
