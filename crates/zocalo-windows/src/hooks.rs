//! WinEvent-backed hook registration.
//!
//! One `SetWinEventHook` registration spans the whole event-class
//! range and backs every logical subscription tracked by the core
//! hook manager. The callback runs on the shell thread; it relays each
//! event to the main window as `LM_HOOKEVENT`, and the dispatch
//! routine fans it out to the subscribed windows — modules observe the
//! OS through that one extra indirection rather than installing hooks
//! of their own.

use std::cell::Cell;

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    PostMessageW, WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS,
};

use zocalo_core::ShellResult;
use zocalo_core::hooks::HookBackend;
use zocalo_core::messages::LM_HOOKEVENT;

/// Lowest hook event class we listen for (EVENT_SYSTEM_FOREGROUND).
const EVENT_MIN: u32 = 0x0003;

/// Highest hook event class we listen for (EVENT_OBJECT_NAMECHANGE).
const EVENT_MAX: u32 = 0x800C;

/// Object id for whole-window events.
const OBJID_WINDOW: i32 = 0;

// Thread-local relay target for the WinEvent callback.
thread_local! {
    static RELAY_TARGET: Cell<isize> = const { Cell::new(0) };
}

/// The single OS-level registration behind the hook manager.
pub struct WinEventBackend {
    target: HWND,
    hook: Option<HWINEVENTHOOK>,
}

impl WinEventBackend {
    /// `target` is the main shell window the callback relays into.
    pub fn new(target: HWND) -> Self {
        Self { target, hook: None }
    }
}

impl HookBackend for WinEventBackend {
    fn engage(&mut self) -> ShellResult<()> {
        RELAY_TARGET.with(|cell| cell.set(self.target.0 as isize));

        // SAFETY: SetWinEventHook registers our callback for
        // system-wide window events. WINEVENT_OUTOFCONTEXT runs it in
        // our process on the installing thread's message loop;
        // WINEVENT_SKIPOWNPROCESS ignores the shell's own windows.
        let hook = unsafe {
            SetWinEventHook(
                EVENT_MIN,
                EVENT_MAX,
                None,
                Some(win_event_proc),
                0,
                0,
                WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
            )
        };

        if hook.is_invalid() {
            return Err("failed to install the WinEvent hook".into());
        }
        self.hook = Some(hook);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(hook) = self.hook.take() {
            // SAFETY: UnhookWinEvent removes the registration made in
            // engage(); the handle is used exactly once.
            unsafe {
                let _ = UnhookWinEvent(hook);
            }
        }
        RELAY_TARGET.with(|cell| cell.set(0));
    }
}

/// The WinEvent callback: relay whole-window events to the shell.
unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    event: u32,
    hwnd: HWND,
    id_object: i32,
    _id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    if id_object != OBJID_WINDOW {
        return;
    }
    let target = RELAY_TARGET.with(Cell::get);
    if target == 0 {
        return;
    }

    // SAFETY: posting only moves plain values onto the shell thread's
    // message queue; the dispatch routine interprets them there.
    unsafe {
        let _ = PostMessageW(
            Some(HWND(target as *mut _)),
            LM_HOOKEVENT,
            WPARAM(event as usize),
            LPARAM(hwnd.0 as isize),
        );
    }
}
