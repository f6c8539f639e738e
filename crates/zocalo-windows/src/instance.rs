//! Running-instance detection and one-shot command forwarding.

use core::ffi::c_void;

use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM, WPARAM};
use windows::Win32::System::Console::GetConsoleWindow;
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::System::Threading::{EVENT_MODIFY_STATE, OpenEventW, SetEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    AllowSetForegroundWindow, FindWindowW, GetWindowThreadProcessId, MB_ICONEXCLAMATION,
    MB_TOPMOST, MessageBoxW, SendMessageW, WM_COPYDATA,
};
use windows::core::{HSTRING, w};

use zocalo_core::ShellResult;
use zocalo_core::ipc::BangCommandRecord;
use zocalo_core::messages::LM_BANGCOMMAND;

use crate::shell::{MAIN_WINDOW_CLASS, MAIN_WINDOW_TITLE};

/// Tells the logon UI's welcome screen to close.
///
/// Must happen before the first message box, which would otherwise
/// pop up underneath the welcome screen.
pub fn signal_shell_ready() {
    // SAFETY: opening a named event that may not exist; every acquired
    // handle is closed before returning.
    unsafe {
        if let Ok(event) = OpenEventW(EVENT_MODIFY_STATE, false, w!("msgina: ShellReadyEvent")) {
            let _ = SetEvent(event);
            let _ = CloseHandle(event);
        }
    }
}

/// Reports a fatal startup error where the user can see it.
///
/// Launched from a console, stderr is enough. Running as the system
/// shell there is no console at all and stderr vanishes, so the error
/// goes to a message box instead.
pub fn report_fatal(text: &str) {
    // SAFETY: console query, then a modal error box; the process is
    // about to exit.
    unsafe {
        if !GetConsoleWindow().is_invalid() {
            return;
        }
        let wide = HSTRING::from(text);
        MessageBoxW(
            None,
            &wide,
            crate::shell::MAIN_WINDOW_TITLE,
            MB_ICONEXCLAMATION | MB_TOPMOST,
        );
    }
}

/// Finds the main window of an already-running shell instance.
pub fn find_running_shell() -> Option<HWND> {
    // SAFETY: FindWindowW is a query; a dead handle is never returned
    // alive.
    unsafe { FindWindowW(MAIN_WINDOW_CLASS, MAIN_WINDOW_TITLE).ok() }
}

/// Forwards a one-shot bang command to a running instance.
///
/// The record travels as a data-copy message; the receiving shell
/// relays it internally as a bang dispatch. Fails when no instance is
/// running or the command does not fit the record.
pub fn forward_bang(command: &str, args: &str) -> ShellResult<()> {
    let Some(target) = find_running_shell() else {
        return Err("no running shell instance".into());
    };

    let record = BangCommandRecord::new(command, args)?;
    let bytes = record.to_bytes();

    // SAFETY: the record bytes stay alive across the synchronous
    // send; AllowSetForegroundWindow merely grants the real instance
    // the right to take the foreground for whatever the bang does.
    unsafe {
        let mut pid = 0u32;
        GetWindowThreadProcessId(target, Some(&mut pid));
        let _ = AllowSetForegroundWindow(pid);

        let cds = COPYDATASTRUCT {
            dwData: LM_BANGCOMMAND as usize,
            cbData: bytes.len() as u32,
            lpData: bytes.as_ptr() as *mut c_void,
        };

        SendMessageW(
            target,
            WM_COPYDATA,
            Some(WPARAM(0)),
            Some(LPARAM(&cds as *const COPYDATASTRUCT as isize)),
        );
    }

    Ok(())
}
