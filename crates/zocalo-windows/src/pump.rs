//! The main message pump.

use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, TranslateMessage, WM_QUIT,
};

use zocalo_core::messages::LM_THREAD_BANGCOMMAND;

use crate::shell::Shell;

/// Blocks on the thread's message queue until quit.
///
/// The exit flag is checked before every blocking retrieval: if a
/// handler processed messages out-of-band via a peek and saw the quit
/// sentinel there, we must not sink back into `GetMessageW` and hang.
pub(crate) fn run_message_pump(shell: &mut Shell) {
    let mut msg = MSG::default();

    while !shell.exit_signaled() && unsafe { GetMessageW(&mut msg, None, 0, 0).as_bool() } {
        handle_queued_message(shell, &msg);
    }
}

/// Routes one retrieved message.
///
/// Thread messages (no target window) never reach a window procedure,
/// so they are picked off here; the only recognized one drains the
/// cross-thread bang queue. Everything windowed goes through the
/// normal translate/dispatch pair into the window procedure.
pub(crate) fn handle_queued_message(shell: &mut Shell, msg: &MSG) {
    if msg.message == WM_QUIT {
        shell.signal_exit();
        return;
    }

    if msg.hwnd.is_invalid() {
        if msg.message == LM_THREAD_BANGCOMMAND {
            shell.drain_thread_bangs();
        }
        return;
    }

    unsafe {
        let _ = TranslateMessage(msg);
        DispatchMessageW(msg);
    }
}
