//! The shell's message-code space.
//!
//! Every code the dispatch routine recognizes is defined here as a
//! plain `u32` so the platform crate can match on them exhaustively
//! in its window procedure. Codes live well above the OS-reserved
//! range and are stable: modules compiled against an older shell keep
//! working, which is also why the obsolete codes below must keep
//! returning a neutral result instead of disappearing.

/// First code of the shell's private block.
pub const LM_FIRST: u32 = 8880;

// -- Obsolete codes --
//
// Handled as no-ops that return 0. Old modules still send these.
pub const LM_GETSHELLOBJECT: u32 = 8884;
pub const LM_WINDOWLIST: u32 = 8885;
pub const LM_MESSAGEMANAGER: u32 = 8886;
pub const LM_DATASTORE: u32 = 8887;

// -- Shell control --

/// Keyboard/system-command shutdown request (carried in `wparam`).
pub const LM_SHUTDOWN: u32 = 8889;
/// The tray service asks the shell to rebroadcast pending tray icons.
pub const LM_SYSTRAYREADY: u32 = 8890;
/// Recycle/logoff/quit/system-shutdown request; `wparam` selects.
pub const LM_RECYCLE: u32 = 8895;

// -- Data store --

/// Save an opaque blob: `wparam` packs ident (high word) and length
/// (low word), `lparam` points at the bytes.
pub const LM_SAVEDATA: u32 = 8892;
/// Restore a blob saved with [`LM_SAVEDATA`] and drop one reference.
pub const LM_RESTOREDATA: u32 = 8893;

// -- Modules --

/// Reload a module by path (`wparam` = path) or by handle when
/// `lparam` carries [`MODULE_BY_HANDLE`].
pub const LM_RELOADMODULE: u32 = 8896;
/// Unload a module by path or handle, same convention as reload.
pub const LM_UNLOADMODULE: u32 = 8897;
/// Enumerate loaded modules through a caller-supplied callback.
pub const LM_ENUMMODULES: u32 = 8905;

// -- Bang commands --

/// Execute a bang command; `lparam` points at a [`crate::ipc::BangCommandRecord`] image.
pub const LM_BANGCOMMAND: u32 = 8898;
/// Thread message: drain the cross-thread bang queue.
pub const LM_THREAD_BANGCOMMAND: u32 = 8899;

// -- Message subscriptions --

/// Register interest in a code list: `wparam` = window, `lparam` = codes.
pub const LM_REGISTERMESSAGE: u32 = 8900;
/// Remove interest in a code list.
pub const LM_UNREGISTERMESSAGE: u32 = 8901;

// -- Hooks --

/// Subscribe a window to a hook event class (`wparam` = window,
/// `lparam` = class).
pub const LM_REGISTERHOOKMESSAGE: u32 = 8902;
/// Unsubscribe; stopping the hook manager when nothing is left.
pub const LM_UNREGISTERHOOKMESSAGE: u32 = 8903;
/// Internal relay: one hook event from the backend, to be fanned out.
pub const LM_HOOKEVENT: u32 = 8904;

// -- Revision-id broadcast --

/// Enumerate the version strings of all subscribed modules.
pub const LM_ENUMREVIDS: u32 = 8906;
/// Sent to each subscriber; the reply buffer is bounded by
/// [`MAX_REVID_LEN`].
pub const LM_GETREVID: u32 = 8907;

// -- Module visibility broadcasts --

pub const LM_HIDEMODULES: u32 = 8908;
pub const LM_SHOWMODULES: u32 = 8909;

/// Shell-hook notifications are remapped into this block: internal
/// code = base + the hook event's low byte.
pub const SHELLHOOK_REMAP_BASE: u32 = 9500;

/// Remapped shell-hook code for "a window was activated". The hook's
/// high byte carries the system-wide full-screen flag.
pub const LM_WINDOWACTIVATED: u32 = SHELLHOOK_REMAP_BASE + 4;

/// Selector values for [`LM_RECYCLE`]'s `wparam`.
pub const RECYCLE_RECYCLE: usize = 1;
pub const RECYCLE_LOGOFF: usize = 2;
pub const RECYCLE_QUIT: usize = 3;
pub const RECYCLE_MSSHUTDOWN: usize = 4;

/// Flag bit in `lparam` of [`LM_RELOADMODULE`]/[`LM_UNLOADMODULE`]:
/// `wparam` is a load handle instead of a path pointer.
pub const MODULE_BY_HANDLE: u32 = 0x1000;

/// Upper bound on a single revision-id reply.
pub const MAX_REVID_LEN: usize = 256;

/// One-shot timer id used while a rude app is suspected but not yet
/// confirmed.
pub const TIMER_RUDEAPP: usize = 1;

/// Delay before re-probing the foreground window, in milliseconds.
pub const RUDEAPP_TIMER_MS: u32 = 1000;

/// Returns true for codes that were once valid but are now handled as
/// side-effect-free no-ops.
pub fn is_obsolete(code: u32) -> bool {
    matches!(
        code,
        LM_GETSHELLOBJECT | LM_WINDOWLIST | LM_MESSAGEMANAGER | LM_DATASTORE
    )
}

/// Remaps a raw shell-hook notification into the internal code space.
///
/// The hook packs the event id in the low byte of its `wparam` and
/// status bits in the high byte; those bits are preserved as the new
/// `lparam` so handlers can inspect them.
pub fn remap_shellhook(wparam: usize) -> (u32, usize) {
    let code = SHELLHOOK_REMAP_BASE + (wparam as u32 & 0x00FF);
    let status = wparam & 0xFF00;
    (code, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obsolete_codes_are_recognized() {
        assert!(is_obsolete(LM_WINDOWLIST));
        assert!(is_obsolete(LM_DATASTORE));
        assert!(!is_obsolete(LM_RECYCLE));
        assert!(!is_obsolete(LM_SAVEDATA));
    }

    #[test]
    fn shellhook_remap_extracts_code_and_status() {
        // Event 4 (window activated) with the full-screen bit set.
        let (code, status) = remap_shellhook(0x8004);
        assert_eq!(code, LM_WINDOWACTIVATED);
        assert_eq!(status, 0x8000);

        let (code, status) = remap_shellhook(0x0006);
        assert_eq!(code, SHELLHOOK_REMAP_BASE + 6);
        assert_eq!(status, 0);
    }
}
