use std::path::{Path, PathBuf};

use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows::core::{HSTRING, PCSTR, PCWSTR};

use zocalo_core::{ShellContext, ShellResult};

/// `init(parent window, load handle, rc path)`, 0 on success.
type InitProc = unsafe extern "system" fn(isize, isize, PCWSTR) -> i32;

/// `quit(load handle)`.
type QuitProc = unsafe extern "system" fn(isize);

/// Shared library mechanics behind every module variant.
///
/// Each variant binds a different pair of entry points; everything
/// else — loading, the start/stop calls, handle identity, unloading —
/// is identical.
pub(super) struct DllHost {
    path: PathBuf,
    library: HMODULE,
    init: InitProc,
    quit: QuitProc,
    started: bool,
}

impl DllHost {
    pub(super) fn load(path: &Path, init_name: PCSTR, quit_name: PCSTR) -> ShellResult<Self> {
        let wide = HSTRING::from(path.as_os_str());

        // SAFETY: LoadLibraryW maps the library into the process; the
        // handle is released in Drop.
        let library = unsafe { LoadLibraryW(&wide)? };

        // SAFETY: GetProcAddress resolves exports in the library we
        // just loaded and keep loaded for the host's lifetime.
        let (init, quit) = unsafe { (GetProcAddress(library, init_name), GetProcAddress(library, quit_name)) };

        let (Some(init), Some(quit)) = (init, quit) else {
            // SAFETY: balancing the LoadLibraryW above; the host is
            // never constructed on this path.
            unsafe {
                let _ = FreeLibrary(library);
            }
            return Err(format!(
                "{} does not export the module entry points",
                path.display()
            )
            .into());
        };

        // SAFETY: the exports follow the documented module ABI; this
        // only reinterprets the untyped FARPROC to that signature.
        let (init, quit) = unsafe {
            (
                std::mem::transmute::<unsafe extern "system" fn() -> isize, InitProc>(init),
                std::mem::transmute::<unsafe extern "system" fn() -> isize, QuitProc>(quit),
            )
        };

        Ok(Self {
            path: path.to_path_buf(),
            library,
            init,
            quit,
            started: false,
        })
    }

    pub(super) fn start(&mut self, ctx: &ShellContext) -> ShellResult<()> {
        let rc_path = HSTRING::from(ctx.rc_path.as_os_str());

        // SAFETY: calling the module's init export per its contract.
        // The rc-path string outlives the call.
        let code = unsafe {
            (self.init)(
                ctx.main_window as isize,
                self.library.0 as isize,
                PCWSTR(rc_path.as_ptr()),
            )
        };

        if code != 0 {
            return Err(format!("{} failed to start (code {code})", self.path.display()).into());
        }
        self.started = true;
        Ok(())
    }

    pub(super) fn stop(&mut self) {
        if self.started {
            self.started = false;
            // SAFETY: the module started successfully, so its quit
            // export is ready to be called exactly once.
            unsafe { (self.quit)(self.library.0 as isize) };
        }
    }

    pub(super) fn handle(&self) -> usize {
        self.library.0 as usize
    }
}

impl Drop for DllHost {
    fn drop(&mut self) {
        // SAFETY: releases the mapping from load(); the entry-point
        // pointers die with self.
        unsafe {
            let _ = FreeLibrary(self.library);
        }
    }
}
