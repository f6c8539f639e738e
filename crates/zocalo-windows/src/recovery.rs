//! Recovery watchdog.
//!
//! A background thread with its own message queue and a global
//! hotkey. When the hotkey fires it checks whether the main window
//! still answers and posts a recycle request either way — posting
//! works even when the pump is wedged behind a stuck handler, and the
//! request is processed the moment the pump drains again. The thread
//! shares no shell state; the only communication back is that posted
//! message, and the only communication in is the quit signal at
//! shutdown.

use std::thread;

use windows::Win32::Foundation::{CloseHandle, LPARAM, WAIT_TIMEOUT, WPARAM};
use windows::Win32::System::Threading::{
    GetCurrentThreadId, OpenThread, TerminateThread, THREAD_SYNCHRONIZE, THREAD_TERMINATE,
    WaitForSingleObject,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, RegisterHotKey, UnregisterHotKey, VK_F12,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, FindWindowW, GetMessageW, MSG, PostMessageW, PostThreadMessageW,
    SMTO_ABORTIFHUNG, SendMessageTimeoutW, TranslateMessage, WM_HOTKEY, WM_NULL, WM_QUIT,
};

use zocalo_core::log_warn;
use zocalo_core::messages::{LM_RECYCLE, RECYCLE_RECYCLE};

use crate::shell::{MAIN_WINDOW_CLASS, MAIN_WINDOW_TITLE};

const RECOVERY_HOTKEY_ID: i32 = 1;

/// How long the responsiveness probe waits, in milliseconds.
const PROBE_TIMEOUT_MS: u32 = 2000;

/// How long shutdown waits for the thread before force-terminating.
const QUIT_TIMEOUT_MS: u32 = 3000;

/// Handle for signalling and stopping the watchdog.
pub struct Watchdog {
    thread_id: u32,
    handle: thread::JoinHandle<()>,
}

/// Starts the watchdog thread. Uses a ready-channel so the caller
/// learns the thread id before continuing.
pub fn start() -> Watchdog {
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<u32>();

    let handle = thread::spawn(move || {
        // SAFETY: reads the current thread's id.
        let thread_id = unsafe { GetCurrentThreadId() };
        let _ = ready_tx.send(thread_id);

        // SAFETY: RegisterHotKey binds the recovery chord to this
        // thread's message queue; unregistered before the thread ends.
        let hotkey = unsafe {
            RegisterHotKey(
                None,
                RECOVERY_HOTKEY_ID,
                MOD_CONTROL | MOD_ALT | MOD_NOREPEAT,
                VK_F12.0 as u32,
            )
        };
        if hotkey.is_err() {
            log_warn!("recovery hotkey unavailable");
        }

        run_watchdog_pump();

        if hotkey.is_ok() {
            // SAFETY: balances the RegisterHotKey above.
            unsafe {
                let _ = UnregisterHotKey(None, RECOVERY_HOTKEY_ID);
            }
        }
    });

    // The spawn closure sends exactly once before anything can fail.
    let thread_id = ready_rx.recv().unwrap_or(0);
    Watchdog { thread_id, handle }
}

impl Watchdog {
    /// Signals the thread to quit, waits a bounded time, and
    /// force-terminates it if it never drains the quit message.
    pub fn stop(self) {
        // SAFETY: posts WM_QUIT to the watchdog's queue.
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }

        // SAFETY: the thread id stays valid while the JoinHandle is
        // held; the opened handle is closed below on every path.
        unsafe {
            if let Ok(thread) = OpenThread(THREAD_SYNCHRONIZE | THREAD_TERMINATE, false, self.thread_id)
            {
                if WaitForSingleObject(thread, QUIT_TIMEOUT_MS) == WAIT_TIMEOUT {
                    log_warn!("recovery watchdog unresponsive, terminating");
                    let _ = TerminateThread(thread, 0);
                }
                let _ = CloseHandle(thread);
            }
        }

        let _ = self.handle.join();
    }
}

/// The watchdog's own small message pump.
fn run_watchdog_pump() {
    let mut msg = MSG::default();

    // SAFETY: a plain GetMessageW loop on this thread's queue.
    while unsafe { GetMessageW(&mut msg, None, 0, 0).as_bool() } {
        if msg.message == WM_HOTKEY && msg.wParam.0 == RECOVERY_HOTKEY_ID as usize {
            trigger_recovery();
            continue;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Probes the main window and posts a recycle request.
fn trigger_recovery() {
    // SAFETY: FindWindowW and the probe are query-only; the post just
    // enqueues onto the main thread.
    unsafe {
        let Ok(main) = FindWindowW(MAIN_WINDOW_CLASS, MAIN_WINDOW_TITLE) else {
            return;
        };

        let mut result = 0usize;
        let answered = SendMessageTimeoutW(
            main,
            WM_NULL,
            WPARAM(0),
            LPARAM(0),
            SMTO_ABORTIFHUNG,
            PROBE_TIMEOUT_MS,
            Some(&mut result),
        );
        if answered.0 == 0 {
            log_warn!("shell unresponsive, queueing forced recycle");
        }

        let _ = PostMessageW(
            Some(main),
            LM_RECYCLE,
            WPARAM(RECYCLE_RECYCLE),
            LPARAM(0),
        );
    }
}
