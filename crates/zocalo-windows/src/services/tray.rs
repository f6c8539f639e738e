use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, HWND_BROADCAST, RegisterClassW,
    RegisterWindowMessageW, SendNotifyMessageW, UnregisterClassW, WNDCLASSW, WS_EX_TOOLWINDOW,
};
use windows::core::w;

use zocalo_core::{ShellResult, log_debug, log_info};

/// The tray notification service.
///
/// Owns the window that notification-area clients look for. Icon
/// bookkeeping and painting live in the modules that render a tray;
/// the shell's side of the contract is the window itself, the
/// re-registration broadcast, and the rude-app signal.
pub struct TrayService {
    hwnd: Option<HWND>,
    rude_app: bool,
}

impl TrayService {
    pub fn new() -> Self {
        Self {
            hwnd: None,
            rude_app: false,
        }
    }

    pub fn start(&mut self) -> ShellResult<()> {
        // SAFETY: standard hidden-window creation; the class is
        // unregistered in stop().
        unsafe {
            let class_name = w!("Shell_TrayWnd");
            let wc = WNDCLASSW {
                lpfnWndProc: Some(tray_wndproc),
                lpszClassName: class_name,
                ..Default::default()
            };

            if RegisterClassW(&wc) == 0 {
                return Err("failed to register the tray window class".into());
            }

            let hwnd = CreateWindowExW(
                WS_EX_TOOLWINDOW,
                class_name,
                w!("Shell_TrayWnd"),
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
                    log_info!("tray service started");
                    Ok(())
                }
                _ => Err("failed to create the tray window".into()),
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(hwnd) = self.hwnd.take() {
            // SAFETY: destroying the window and class created in
            // start().
            unsafe {
                let _ = DestroyWindow(hwnd);
                let _ = UnregisterClassW(w!("Shell_TrayWnd"), None);
            }
        }
    }

    /// Asks every notification-area client to re-register its icons.
    ///
    /// Sent when a tray-rendering module reports ready, so icons added
    /// before the module loaded are not lost. Returns the tray window
    /// handle, 0 when the service is not running.
    pub fn send_system_tray(&self) -> isize {
        let Some(hwnd) = self.hwnd else {
            return 0;
        };

        // SAFETY: broadcasting the documented re-registration message;
        // SendNotifyMessageW does not block on hung receivers.
        unsafe {
            let msg = RegisterWindowMessageW(w!("TaskbarCreated"));
            if msg != 0 {
                let _ = SendNotifyMessageW(HWND_BROADCAST, msg, WPARAM(0), LPARAM(0));
            }
        }
        hwnd.0 as isize
    }

    /// Records whether a full-screen app owns the foreground.
    pub fn notify_rude_app(&mut self, is_full_screen: bool) {
        self.rude_app = is_full_screen;
        log_debug!("tray rude-app state: {is_full_screen}");
    }
}

/// WNDPROC for the tray window. The notification protocol itself is
/// handled by whichever module renders the tray.
unsafe extern "system" fn tray_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}
