//! The window procedure and per-message dispatch.
//!
//! Every incoming message runs through one closed match over the
//! shell's code space. Built-in codes act directly on the owning
//! subsystem; anything unrecognized is offered to the message
//! registry's subscribers before falling back to the default window
//! procedure. Handler execution is fenced with `catch_unwind` so a
//! faulting handler (or module code reached through one) cannot
//! unwind across the FFI boundary or take the pump down with it.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::DataExchange::COPYDATASTRUCT;
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::Win32::System::Shutdown::{EWX_LOGOFF, ExitWindowsEx, SHTDN_REASON_MAJOR_OTHER};
use windows::Win32::UI::WindowsAndMessaging::{
    DefWindowProcW, GetForegroundWindow, KillTimer, PostQuitMessage, SC_CLOSE, SendMessageW,
    SetTimer, WM_COPYDATA, WM_ENDSESSION, WM_KEYDOWN, WM_QUERYENDSESSION, WM_SYSCOMMAND, WM_TIMER,
};
use windows::core::{BOOL, HSTRING, PCSTR, PCWSTR, w};

use zocalo_core::fullscreen::FsChange;
use zocalo_core::hooks::HookManager;
use zocalo_core::ipc::BangCommandRecord;
use zocalo_core::messages::{
    LM_BANGCOMMAND, LM_ENUMMODULES, LM_ENUMREVIDS, LM_GETREVID, LM_HIDEMODULES, LM_HOOKEVENT,
    LM_RECYCLE, LM_REGISTERHOOKMESSAGE, LM_REGISTERMESSAGE, LM_RELOADMODULE, LM_RESTOREDATA,
    LM_SAVEDATA, LM_SHOWMODULES, LM_SHUTDOWN, LM_SYSTRAYREADY, LM_UNLOADMODULE,
    LM_UNREGISTERHOOKMESSAGE, LM_UNREGISTERMESSAGE, LM_WINDOWACTIVATED, MAX_REVID_LEN,
    MODULE_BY_HANDLE, RECYCLE_LOGOFF, RECYCLE_QUIT, RECYCLE_RECYCLE, RUDEAPP_TIMER_MS,
    TIMER_RUDEAPP, is_obsolete, remap_shellhook,
};
use zocalo_core::{DataStore, log_debug, log_error, log_warn};

use crate::fullscreen;
use crate::hooks::WinEventBackend;
use crate::shell::Shell;

/// Callback signature for the revision-id enumeration.
type EnumRevIdsProc = unsafe extern "system" fn(PCWSTR, LPARAM) -> BOOL;

/// Callback signature for the module enumeration.
type EnumModulesProc = unsafe extern "system" fn(PCWSTR, u32, LPARAM) -> BOOL;

// The shell owned by the running `Shell::run` frame on this thread.
thread_local! {
    static CURRENT_SHELL: Cell<*mut Shell> = const { Cell::new(std::ptr::null_mut()) };
}

pub(crate) fn set_current(shell: &mut Shell) {
    CURRENT_SHELL.with(|cell| cell.set(shell as *mut Shell));
}

pub(crate) fn clear_current() {
    CURRENT_SHELL.with(|cell| cell.set(std::ptr::null_mut()));
}

/// WNDPROC of the main shell window.
pub(crate) unsafe extern "system" fn main_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let ptr = CURRENT_SHELL.with(Cell::get);
    if ptr.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    // SAFETY: the pointer targets the Shell owned by the `run` frame
    // on this same thread, alive for the whole window lifetime.
    // Re-entry happens only through same-thread SendMessage; the one
    // state machine that must not re-enter (recycle) carries its own
    // guard.
    let shell = unsafe { &mut *ptr };

    match std::panic::catch_unwind(AssertUnwindSafe(|| {
        shell.handle_window_message(hwnd, msg, wparam, lparam)
    })) {
        Ok(result) => result,
        Err(_) => {
            log_error!("handler fault isolated (message {msg:#06x})");
            LRESULT(0)
        }
    }
}

impl Shell {
    /// The dispatch routine: one message in, one result out.
    pub(crate) fn handle_window_message(
        &mut self,
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_KEYDOWN | WM_SYSCOMMAND => {
                if wparam.0 == LM_SHUTDOWN as usize || wparam.0 == SC_CLOSE as usize {
                    self.execute_bang(hwnd.0 as usize, "!shutdown", "");
                    LRESULT(0)
                } else {
                    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
                }
            }

            WM_QUERYENDSESSION | WM_ENDSESSION => LRESULT(1),

            WM_TIMER if wparam.0 == TIMER_RUDEAPP => {
                self.on_rudeapp_timer(hwnd);
                LRESULT(0)
            }

            WM_COPYDATA => self.on_copydata(lparam),

            LM_SYSTRAYREADY => {
                LRESULT(self.services.tray_mut().map_or(0, |t| t.send_system_tray()))
            }

            LM_SAVEDATA => self.on_save_data(wparam, lparam),
            LM_RESTOREDATA => self.on_restore_data(wparam, lparam),

            code if is_obsolete(code) => LRESULT(0),

            LM_ENUMREVIDS => LRESULT(self.enum_rev_ids(wparam, lparam)),
            LM_ENUMMODULES => LRESULT(self.enum_modules_ffi(wparam, lparam)),

            LM_RECYCLE => {
                match wparam.0 {
                    RECYCLE_RECYCLE => self.recycle(),
                    RECYCLE_LOGOFF => {
                        // SAFETY: asks the session to end; quitting the
                        // pump only once the request was accepted.
                        unsafe {
                            if ExitWindowsEx(EWX_LOGOFF, SHTDN_REASON_MAJOR_OTHER).is_ok() {
                                PostQuitMessage(0);
                            }
                        }
                    }
                    RECYCLE_QUIT => unsafe { PostQuitMessage(0) },
                    _ => self.open_shutdown_dialog(),
                }
                LRESULT(0)
            }

            LM_RELOADMODULE => {
                if lparam.0 as u32 & MODULE_BY_HANDLE != 0 {
                    let ctx = self.context();
                    if let Err(e) = self.module_manager.reload_module(&ctx, wparam.0) {
                        log_warn!("{e}");
                    }
                } else if let Some(path) = read_wide_path(wparam.0) {
                    let ctx = self.context();
                    self.module_manager.quit_module(&path);
                    if let Err(e) = self.module_manager.load_module(&ctx, &path, lparam.0 as u32) {
                        log_warn!("{e}");
                    }
                }
                LRESULT(0)
            }

            LM_UNLOADMODULE => {
                if lparam.0 as u32 & MODULE_BY_HANDLE != 0 {
                    self.module_manager.quit_module_by_handle(wparam.0);
                } else if let Some(path) = read_wide_path(wparam.0) {
                    self.module_manager.quit_module(&path);
                }
                LRESULT(0)
            }

            LM_BANGCOMMAND => self.on_bang_record(lparam),

            LM_REGISTERHOOKMESSAGE => self.on_register_hook(wparam, lparam),

            LM_UNREGISTERHOOKMESSAGE => {
                if let Some(manager) = self.hook_manager.as_mut() {
                    if manager.unregister(wparam.0, lparam.0 as u32) == 0 {
                        // Last subscription gone: drop the manager,
                        // which releases the OS hook.
                        self.hook_manager = None;
                    }
                }
                LRESULT(0)
            }

            LM_HOOKEVENT => {
                if let Some(manager) = self.hook_manager.as_ref() {
                    manager.dispatch(wparam.0 as u32, lparam.0 as usize, 0, |window, code, wp, lp| {
                        deliver_to_window(window, code, wp, lp);
                    });
                }
                LRESULT(0)
            }

            LM_REGISTERMESSAGE => {
                let codes = read_code_list(lparam.0);
                self.message_manager.add_messages(wparam.0, &codes);
                LRESULT(0)
            }

            LM_UNREGISTERMESSAGE => {
                let codes = read_code_list(lparam.0);
                self.message_manager.remove_messages(wparam.0, &codes);
                LRESULT(0)
            }

            _ => self.on_unrecognized(hwnd, msg, wparam, lparam),
        }
    }

    /// Shell-hook remap, subscriber forwarding, default fallback.
    fn on_unrecognized(&mut self, hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        let mut code = msg;
        let mut wp = wparam.0;
        let mut lp = lparam.0;

        if self.shellhook_msg != 0 && msg == self.shellhook_msg {
            // The hook packs its event id into wparam; the subject
            // window arrives in lparam. Swap into the internal shape:
            // wparam = window, lparam = status bits.
            let (mapped, status) = remap_shellhook(wparam.0);
            code = mapped;
            wp = lparam.0 as usize;
            lp = status as isize;

            if code == LM_WINDOWACTIVATED {
                self.on_window_activated(hwnd, wp, status != 0);
            }
        }

        if self.message_manager.handler_exists(code) {
            let result = self
                .message_manager
                .send_message(code, wp, lp, deliver_to_window);
            return LRESULT(result);
        }

        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    }

    fn on_copydata(&mut self, lparam: LPARAM) -> LRESULT {
        if lparam.0 == 0 {
            return LRESULT(0);
        }
        // SAFETY: WM_COPYDATA guarantees the struct and its payload
        // stay mapped for the duration of this (synchronous) call.
        let cds = unsafe { &*(lparam.0 as *const COPYDATASTRUCT) };
        if cds.dwData != LM_BANGCOMMAND as usize || cds.lpData.is_null() {
            return LRESULT(0);
        }
        let bytes =
            unsafe { std::slice::from_raw_parts(cds.lpData as *const u8, cds.cbData as usize) };

        match BangCommandRecord::from_bytes(bytes) {
            Ok(record) => {
                self.execute_bang(record.target as usize, &record.command, &record.args);
                LRESULT(1)
            }
            Err(e) => {
                log_warn!("rejected bang record: {e}");
                LRESULT(0)
            }
        }
    }

    /// An in-process sender points lparam at a record image.
    fn on_bang_record(&mut self, lparam: LPARAM) -> LRESULT {
        if lparam.0 == 0 {
            return LRESULT(0);
        }
        // SAFETY: in-process senders pass a live record image of the
        // fixed documented size.
        let bytes = unsafe {
            std::slice::from_raw_parts(
                lparam.0 as *const u8,
                zocalo_core::ipc::BANG_RECORD_SIZE,
            )
        };
        match BangCommandRecord::from_bytes(bytes) {
            Ok(record) => LRESULT(self.execute_bang(
                record.target as usize,
                &record.command,
                &record.args,
            )),
            Err(_) => LRESULT(0),
        }
    }

    fn on_save_data(&mut self, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        let ident = (wparam.0 >> 16) as u16;
        let len = wparam.0 & 0xFFFF;
        if lparam.0 == 0 || len == 0 {
            return LRESULT(0);
        }
        // SAFETY: the saver passes its blob pointer and length packed
        // per the save contract; the send is synchronous.
        let bytes = unsafe { std::slice::from_raw_parts(lparam.0 as *const u8, len) };

        // The store comes to life on the first save.
        let store = self.data_store.get_or_insert_with(DataStore::new);
        LRESULT(store.store(ident, bytes) as isize)
    }

    fn on_restore_data(&mut self, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        let ident = (wparam.0 >> 16) as u16;
        let len = wparam.0 & 0xFFFF;
        if lparam.0 == 0 || len == 0 {
            return LRESULT(0);
        }
        let Some(store) = self.data_store.as_mut() else {
            return LRESULT(0);
        };
        // SAFETY: the restorer owns a writable buffer of the packed
        // length.
        let out = unsafe { std::slice::from_raw_parts_mut(lparam.0 as *mut u8, len) };
        let restored = store.release(ident, out).is_some();

        // Last entry released: the store dies with it.
        if store.is_empty() {
            self.data_store = None;
        }
        LRESULT(restored as isize)
    }

    fn on_register_hook(&mut self, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
        if self.hook_manager.is_none() {
            match HookManager::start(WinEventBackend::new(self.hwnd())) {
                Ok(manager) => self.hook_manager = Some(manager),
                Err(e) => {
                    log_warn!("hook manager unavailable: {e}");
                    return LRESULT(0);
                }
            }
        }
        if let Some(manager) = self.hook_manager.as_mut() {
            manager.register(wparam.0, lparam.0 as u32);
            return LRESULT(1);
        }
        LRESULT(0)
    }

    /// Collects revision-id strings from every subscribed window and
    /// feeds them to the caller's callback. Returns 0 when the whole
    /// set was visited, 1 when the callback stopped early, -1 when
    /// nobody subscribes.
    fn enum_rev_ids(&self, wparam: WPARAM, lparam: LPARAM) -> isize {
        if wparam.0 == 0 {
            return -1;
        }
        // SAFETY: the sender passes a callback of the documented
        // enumeration signature.
        let callback = unsafe { std::mem::transmute::<usize, EnumRevIdsProc>(wparam.0) };

        let mut subscribers = BTreeSet::new();
        if !self
            .message_manager
            .windows_for_message(LM_GETREVID, &mut subscribers)
        {
            return -1;
        }

        for window in subscribers {
            // Replies are bounded; modules should assume far less.
            let mut buffer = [0u16; MAX_REVID_LEN];
            let got = deliver_to_window(window, LM_GETREVID, 0, buffer.as_mut_ptr() as isize);
            if got > 0 {
                // SAFETY: the subscriber filled (part of) our
                // NUL-terminated buffer; the callback contract matches.
                let keep = unsafe { callback(PCWSTR(buffer.as_ptr()), lparam) };
                if !keep.as_bool() {
                    return 1;
                }
            }
        }
        0
    }

    /// Walks loaded modules through the caller's callback.
    fn enum_modules_ffi(&self, wparam: WPARAM, lparam: LPARAM) -> isize {
        if wparam.0 == 0 {
            return -1;
        }
        // SAFETY: the sender passes a callback of the documented
        // enumeration signature.
        let callback = unsafe { std::mem::transmute::<usize, EnumModulesProc>(wparam.0) };

        self.module_manager.enum_modules(|path, flags| {
            let wide = HSTRING::from(path.as_os_str());
            // SAFETY: the path string outlives the synchronous call.
            let keep = unsafe { callback(PCWSTR(wide.as_ptr()), flags, lparam) };
            if keep.as_bool() {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
        0
    }

    /// A window was activated; the status bit claims a rude app may
    /// be running somewhere.
    fn on_window_activated(&mut self, hwnd: HWND, activated: usize, rude_flag: bool) {
        // Any pending re-probe is stale now.
        unsafe {
            let _ = KillTimer(Some(hwnd), TIMER_RUDEAPP);
        }

        let probe =
            fullscreen::is_full_screen_active(self.hwnd(), HWND(activated as *mut _));
        let activation = self.fullscreen.on_window_activated(rude_flag, probe);

        if let Some(change) = activation.change {
            self.apply_fullscreen_change(change);
        }
        if activation.arm_timer {
            unsafe {
                let _ = SetTimer(Some(hwnd), TIMER_RUDEAPP, RUDEAPP_TIMER_MS, None);
            }
        }
    }

    /// Deferred re-probe of the foreground window.
    fn on_rudeapp_timer(&mut self, hwnd: HWND) {
        let foreground = unsafe { GetForegroundWindow() };
        let probe = fullscreen::is_full_screen_active(self.hwnd(), foreground);

        if let Some(change) = self.fullscreen.on_timer(probe) {
            self.apply_fullscreen_change(change);
        }
        // One-shot: the timer dies after its answer either way.
        unsafe {
            let _ = KillTimer(Some(hwnd), TIMER_RUDEAPP);
        }
    }

    fn apply_fullscreen_change(&mut self, change: FsChange) {
        let entered = change == FsChange::Entered;
        log_debug!("full-screen app {}", if entered { "confirmed" } else { "gone" });

        if let Some(tray) = self.services.tray_mut() {
            tray.notify_rude_app(entered);
        }
        if self.auto_hide_modules {
            let code = if entered { LM_HIDEMODULES } else { LM_SHOWMODULES };
            self.message_manager
                .send_message(code, 0, 0, deliver_to_window);
        }
    }

    /// Opens the system shutdown flow, exported by ordinal only.
    fn open_shutdown_dialog(&self) {
        // SAFETY: resolving and calling a well-known ordinal export;
        // silently absent on systems that dropped it.
        unsafe {
            let Ok(shell32) = GetModuleHandleW(w!("shell32.dll")) else {
                return;
            };
            let Some(proc) = GetProcAddress(shell32, PCSTR(60 as *const u8)) else {
                return;
            };
            let shutdown_dialog = std::mem::transmute::<
                unsafe extern "system" fn() -> isize,
                unsafe extern "system" fn(HWND) -> i32,
            >(proc);
            let _ = shutdown_dialog(self.hwnd());
        }
    }
}

/// Synchronous delivery of one message to one subscriber window.
pub(crate) fn deliver_to_window(window: usize, code: u32, wparam: usize, lparam: isize) -> isize {
    // SAFETY: sending to a window handle a module registered; a stale
    // handle makes the send fail with 0, which is fine.
    unsafe {
        SendMessageW(
            HWND(window as *mut _),
            code,
            Some(WPARAM(wparam)),
            Some(LPARAM(lparam)),
        )
        .0
    }
}

/// Reads the zero-terminated code list a module passes when
/// (un)registering message interest.
fn read_code_list(ptr: isize) -> Vec<u32> {
    // Guards against a module passing garbage without a terminator.
    const MAX_CODES: usize = 64;

    let mut codes = Vec::new();
    if ptr == 0 {
        return codes;
    }
    let mut cursor = ptr as *const u32;
    // SAFETY: the registration contract terminates the list with 0;
    // the cap bounds the damage if a module violates it.
    unsafe {
        while codes.len() < MAX_CODES {
            let code = cursor.read_unaligned();
            if code == 0 {
                break;
            }
            codes.push(code);
            cursor = cursor.add(1);
        }
    }
    codes
}

/// Reads a NUL-terminated wide path passed by pointer.
fn read_wide_path(ptr: usize) -> Option<PathBuf> {
    if ptr == 0 {
        return None;
    }
    // SAFETY: the sender passes a NUL-terminated wide string that
    // lives for the duration of the synchronous send.
    unsafe { PCWSTR(ptr as *const u16).to_string().ok().map(PathBuf::from) }
}

#[cfg(test)]
mod tests {
    use super::read_code_list;

    #[test]
    fn code_list_stops_at_terminator() {
        let list: [u32; 5] = [9601, 9602, 9603, 0, 7777];
        let codes = read_code_list(list.as_ptr() as isize);
        assert_eq!(codes, vec![9601, 9602, 9603]);
    }

    #[test]
    fn null_list_is_empty() {
        assert!(read_code_list(0).is_empty());
    }
}
