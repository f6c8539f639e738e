use std::mem;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, HMONITOR, MONITOR_DEFAULTTONEAREST, MONITORINFO, MonitorFromWindow,
};

/// Returns the full bounds of the monitor containing `hwnd`.
///
/// Full-screen detection compares window rectangles against this, not
/// the work area: a rude app covers the taskbar too.
pub fn monitor_bounds_for_window(hwnd: HWND) -> Option<RECT> {
    let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
    monitor_info(monitor).map(|info| info.rcMonitor)
}

/// Returns the work area of the monitor containing `hwnd`.
///
/// The work area excludes the taskbar and docked desktop toolbars;
/// normal-position window rectangles are expressed relative to it.
pub fn work_area_for_window(hwnd: HWND) -> Option<RECT> {
    let monitor = unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) };
    monitor_info(monitor).map(|info| info.rcWork)
}

fn monitor_info(monitor: HMONITOR) -> Option<MONITORINFO> {
    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };

    // SAFETY: GetMonitorInfoW fills the MONITORINFO struct with
    // monitor dimensions. We set cbSize as required by the API.
    let success = unsafe { GetMonitorInfoW(monitor, &mut info) };

    success.as_bool().then_some(info)
}
