//! Full-screen window probing.
//!
//! The pure state machine lives in `zocalo-core`; this module answers
//! its one question: is a full-screen window active right now? The
//! shell-hook activation bit alone cannot be trusted — it is set
//! whenever any full-screen app exists system-wide — so we measure the
//! activated window's thread against the monitor it occupies.

use std::mem;

use windows::Win32::Foundation::{HWND, LPARAM, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumThreadWindows, GWL_EXSTYLE, GWL_STYLE, GetClientRect, GetWindowLongPtrW,
    GetWindowPlacement, GetWindowRect, GetWindowThreadProcessId, IsWindow, IsWindowVisible,
    WINDOWPLACEMENT, WS_CAPTION, WS_EX_TOOLWINDOW, WS_MAXIMIZE, WS_THICKFRAME,
};
use windows::core::BOOL;

use crate::monitor;

/// Returns whether any window on `hwnd`'s thread is full screen.
///
/// Windows belonging to the shell's own process never count, so the
/// shell cannot hide its modules in reaction to itself.
pub fn is_full_screen_active(shell_window: HWND, hwnd: HWND) -> bool {
    // SAFETY: query-only calls on window handles; stale handles just
    // return zeroes.
    unsafe {
        if !IsWindow(Some(hwnd)).as_bool() {
            return false;
        }

        let mut pid = 0u32;
        let thread = GetWindowThreadProcessId(hwnd, Some(&mut pid));

        let mut shell_pid = 0u32;
        GetWindowThreadProcessId(shell_window, Some(&mut shell_pid));

        if pid == shell_pid {
            return false;
        }

        let mut found = false;
        let _ = EnumThreadWindows(
            thread,
            Some(enum_thread_window),
            LPARAM(&mut found as *mut bool as isize),
        );
        found
    }
}

/// Callback for `EnumThreadWindows`: stop at the first full-screen
/// window on the thread.
unsafe extern "system" fn enum_thread_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam points at the caller's flag; the enumeration runs
    // synchronously, so the pointer outlives this call.
    let found = unsafe { &mut *(lparam.0 as *mut bool) };
    if is_window_full_screen(hwnd) {
        *found = true;
        return BOOL(0);
    }
    BOOL(1)
}

/// Measures one window against the full bounds of its monitor.
pub fn is_window_full_screen(hwnd: HWND) -> bool {
    // SAFETY: query-only window and monitor lookups.
    unsafe {
        if !IsWindow(Some(hwnd)).as_bool() || !IsWindowVisible(hwnd).as_bool() {
            return false;
        }

        let Some(screen) = monitor::monitor_bounds_for_window(hwnd) else {
            return false;
        };

        // A client area the size of the monitor is full screen no
        // matter what the styles say.
        let mut client = RECT::default();
        if GetClientRect(hwnd, &mut client).is_err() {
            return false;
        }
        if client.right - client.left == screen.right - screen.left
            && client.bottom - client.top == screen.bottom - screen.top
        {
            return true;
        }

        // With a caption and a sizing frame both present this is an
        // ordinary window; otherwise compare its outer rectangle.
        let style = GetWindowLongPtrW(hwnd, GWL_STYLE) as u32;
        if style & WS_CAPTION.0 == WS_CAPTION.0 && style & WS_THICKFRAME.0 == WS_THICKFRAME.0 {
            return false;
        }

        let mut rect = RECT::default();
        if style & WS_MAXIMIZE.0 != 0 {
            if GetWindowRect(hwnd, &mut rect).is_err() {
                return false;
            }
        } else {
            // The window may still be animating towards its final
            // size; the normal-position rectangle already has the
            // dimensions it will settle at.
            let mut wp = WINDOWPLACEMENT {
                length: mem::size_of::<WINDOWPLACEMENT>() as u32,
                ..Default::default()
            };
            if GetWindowPlacement(hwnd, &mut wp).is_err() {
                return false;
            }
            rect = wp.rcNormalPosition;

            // Normal-position coordinates are workspace-relative
            // unless the window is a tool window.
            let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE) as u32;
            if ex_style & WS_EX_TOOLWINDOW.0 == 0 {
                if let Some(work) = monitor::work_area_for_window(hwnd) {
                    rect.left += work.left;
                    rect.right += work.left;
                    rect.top += work.top;
                    rect.bottom += work.top;
                }
            }
        }

        rect.left == screen.left
            && rect.top == screen.top
            && rect.right == screen.right
            && rect.bottom == screen.bottom
    }
}
