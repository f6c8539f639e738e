use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, RegisterClassW, UnregisterClassW, WNDCLASSW,
    WS_EX_TOOLWINDOW,
};
use windows::core::w;

use zocalo_core::{ShellResult, log_info};

/// Which legacy inter-process bridge to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyIpcMode {
    /// Defer to the system's own implementation; hold the slot only.
    Stub,
    /// Own the conversation window ourselves.
    Full,
}

/// Bridge for the legacy program-group messaging protocol.
///
/// Old launchers still probe for it at session start. The protocol
/// conversation itself is external; this service owns the window the
/// probes find and its lifecycle.
pub struct LegacyIpcService {
    mode: LegacyIpcMode,
    hwnd: Option<HWND>,
}

impl LegacyIpcService {
    pub fn new(mode: LegacyIpcMode) -> Self {
        Self { mode, hwnd: None }
    }

    pub fn start(&mut self) -> ShellResult<()> {
        if self.mode == LegacyIpcMode::Stub {
            log_info!("legacy IPC: deferring to the system implementation");
            return Ok(());
        }

        // SAFETY: standard hidden-window creation; torn down in
        // stop().
        unsafe {
            let class_name = w!("ZocaloLegacyIpc");
            let wc = WNDCLASSW {
                lpfnWndProc: Some(ipc_wndproc),
                lpszClassName: class_name,
                ..Default::default()
            };

            if RegisterClassW(&wc) == 0 {
                return Err("failed to register the legacy IPC window class".into());
            }

            let hwnd = CreateWindowExW(
                WS_EX_TOOLWINDOW,
                class_name,
                w!("ZocaloLegacyIpc"),
                Default::default(),
                0,
                0,
                0,
                0,
                None,
                None,
                None,
                None,
            );

            match hwnd {
                Ok(h) if !h.is_invalid() => {
                    self.hwnd = Some(h);
                    log_info!("legacy IPC bridge started");
                    Ok(())
                }
                _ => Err("failed to create the legacy IPC window".into()),
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            // SAFETY: destroying the window and class created in
            // start().
            unsafe {
                let _ = DestroyWindow(hwnd);
                let _ = UnregisterClassW(w!("ZocaloLegacyIpc"), None);
            }
        }
    }
}

unsafe extern "system" fn ipc_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}
