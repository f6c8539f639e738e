//! The shell object: owner of the main window, the managers, and the
//! whole startup → pump → shutdown sequence.

use std::mem;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use core::ffi::c_void;

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::Win32::System::Ole::{OleInitialize, OleUninitialize};
use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_SHIFT};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DeregisterShellHookWindow, DestroyWindow, FindWindowW, GWLP_USERDATA,
    GetDesktopWindow, IDNO, MB_DEFBUTTON2, MB_ICONEXCLAMATION, MB_OK, MB_TOPMOST, MB_YESNO,
    MINIMIZEDMETRICS, MessageBoxW, PostMessageW, RegisterClassW, RegisterShellHookWindow,
    RegisterWindowMessageW, SPI_GETMINIMIZEDMETRICS, SPI_SETMINIMIZEDMETRICS, SendMessageW,
    SetWindowLongPtrW, SystemParametersInfoW, UnregisterClassW, WM_USER, WNDCLASSW,
    WS_EX_TOOLWINDOW,
};
use windows::core::{PCWSTR, s, w};

use zocalo_core::bangs::{BangAction, BangRegistry};
use zocalo_core::config::RcFile;
use zocalo_core::fullscreen::FullScreenMonitor;
use zocalo_core::hooks::HookManager;
use zocalo_core::messages::{
    LM_HIDEMODULES, LM_RECYCLE, LM_SHOWMODULES, RECYCLE_LOGOFF, RECYCLE_MSSHUTDOWN, RECYCLE_QUIT,
    RECYCLE_RECYCLE,
};
use zocalo_core::module::ShellContext;
use zocalo_core::recycle::RecycleGuard;
use zocalo_core::startup::{StartupMode, should_run_startup};
use zocalo_core::{DataStore, MessageManager, ModuleManager, log_debug, log_info, log_warn};

use crate::dispatch::{self, deliver_to_window};
use crate::error::StartupError;
use crate::hooks::WinEventBackend;
use crate::modules::WinModuleFactory;
use crate::pump;
use crate::recovery;
use crate::relay::{BangRelay, QueuedBang, bang_channel};
use crate::services::ServiceRegistry;
use crate::startup;

/// Class and title of the main shell window. One-shot senders find a
/// running instance through these.
pub const MAIN_WINDOW_CLASS: PCWSTR = w!("ZocaloShell");
pub const MAIN_WINDOW_TITLE: PCWSTR = w!("Zocalo");

/// Marker stored in the main window's user data; virtual window
/// managers use it to leave the shell's own window alone.
const MAGIC_USERDATA: isize = 0x4F43_5A43; // "CZCO"

/// Hide-on-minimize bit for MINIMIZEDMETRICS.iArrange.
const ARW_HIDE: i32 = 0x0008;

/// Everything the dispatch routine works on. One instance per
/// process, alive from window creation until window destruction.
pub struct Shell {
    main_window: HWND,
    pub(crate) rc: RcFile,
    bangs: BangRegistry,
    pub(crate) message_manager: MessageManager,
    pub(crate) module_manager: ModuleManager,
    pub(crate) data_store: Option<DataStore>,
    pub(crate) hook_manager: Option<HookManager<WinEventBackend>>,
    pub(crate) services: ServiceRegistry,
    pub(crate) fullscreen: FullScreenMonitor,
    recycle_guard: RecycleGuard,
    pub(crate) auto_hide_modules: bool,
    signal_exit: bool,
    pub(crate) shellhook_msg: u32,
    bang_rx: Receiver<QueuedBang>,
    relay: BangRelay,
    app_path: PathBuf,
}

/// Runs the shell to completion: startup, pump, shutdown.
pub fn run(rc: RcFile, startup_mode: StartupMode) -> Result<(), StartupError> {
    // Required OS bridge first; nothing below works without it.
    // SAFETY: OleInitialize on the thread that will own the UI.
    if unsafe { OleInitialize(None) }.is_err() {
        crate::instance::report_fatal("Failed to initialize the OLE/COM subsystem.");
        return Err(StartupError::ApiInit);
    }

    let result = boot(rc, startup_mode);

    // SAFETY: balances the successful OleInitialize above.
    unsafe { OleUninitialize() };

    result
}

fn boot(rc: RcFile, startup_mode: StartupMode) -> Result<(), StartupError> {
    // The watchdog comes up before anything that could wedge.
    let watchdog = recovery::start();

    apply_minimize_policy();

    let run_startup_items =
        should_run_startup(startup_mode, shift_held(), rc.bool("nostartup", true));

    // A tray window means some other shell already owns the desktop.
    let other_shell_active = detect_other_shell();
    if other_shell_active
        && !rc.bool("noshellwarning", false)
        && !confirm_run_alongside()
    {
        watchdog.stop();
        return Err(StartupError::Aborted);
    }

    if !register_window_class() {
        crate::instance::report_fatal("Error registering the main shell window class.");
        watchdog.stop();
        return Err(StartupError::WindowClass);
    }

    let pump_thread = unsafe { windows::Win32::System::Threading::GetCurrentThreadId() };
    let (relay, bang_rx) = bang_channel(pump_thread);

    let auto_hide = rc.bool("autohidemodules", false);
    let services = ServiceRegistry::from_rc(&rc);
    let mut shell = Box::new(Shell {
        main_window: HWND::default(),
        rc,
        bangs: BangRegistry::new(),
        message_manager: MessageManager::new(),
        module_manager: ModuleManager::new(Box::new(WinModuleFactory)),
        data_store: None,
        hook_manager: None,
        services,
        fullscreen: FullScreenMonitor::new(),
        recycle_guard: RecycleGuard::new(),
        auto_hide_modules: auto_hide,
        signal_exit: false,
        shellhook_msg: 0,
        bang_rx,
        relay,
        app_path: app_path(),
    });

    // The window procedure needs the shell before CreateWindowExW
    // delivers WM_CREATE.
    dispatch::set_current(&mut shell);

    let Some(hwnd) = create_main_window() else {
        crate::instance::report_fatal("Error creating the main shell window.");
        dispatch::clear_current();
        unregister_window_class();
        watchdog.stop();
        return Err(StartupError::WindowCreation);
    };
    shell.main_window = hwnd;

    // SAFETY: tagging our own window with the skip-me marker.
    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, MAGIC_USERDATA);
    }

    // Best-effort integrations: without the shell hook, full-screen
    // detection and task notifications stop working, but the shell
    // still runs.
    // SAFETY: plain registrations against our own window.
    let shellhook_registered = unsafe { RegisterShellHookWindow(hwnd) }.as_bool();
    shell.shellhook_msg = unsafe { RegisterWindowMessageW(w!("SHELLHOOK")) };
    if !shellhook_registered {
        log_warn!("shell hook unavailable, full-screen detection disabled");
    }

    if !other_shell_active && shell.rc.bool("setasshell", false) {
        claim_shell_window(hwnd);
    }

    shell.services.start_all();
    shell.start_managers();

    if run_startup_items {
        let items: Vec<String> = shell
            .rc
            .startup_apps()
            .into_iter()
            .map(str::to_string)
            .collect();
        startup::spawn_runner(items);
    }

    // Tell the desktop the shell finished loading.
    // SAFETY: a plain notification send.
    unsafe {
        SendMessageW(GetDesktopWindow(), WM_USER, Some(WPARAM(0)), Some(LPARAM(0)));
    }

    log_info!(
        "shell up, {} module(s) running",
        shell.module_manager.module_count()
    );

    pump::run_message_pump(&mut shell);

    // Shutdown mirrors startup in reverse.
    if shellhook_registered {
        // SAFETY: balances RegisterShellHookWindow above.
        unsafe {
            let _ = DeregisterShellHookWindow(hwnd);
        }
    }

    shell.stop_managers();
    shell.data_store = None;
    shell.services.stop_all();
    shell.services.release_all();

    dispatch::clear_current();

    // SAFETY: tearing down the window and class created above.
    unsafe {
        let _ = DestroyWindow(hwnd);
    }
    unregister_window_class();

    watchdog.stop();
    log_info!("shell down");
    Ok(())
}

impl Shell {
    pub(crate) fn hwnd(&self) -> HWND {
        self.main_window
    }

    pub(crate) fn exit_signaled(&self) -> bool {
        self.signal_exit
    }

    pub(crate) fn signal_exit(&mut self) {
        self.signal_exit = true;
    }

    /// A clonable handle other threads use to queue bangs.
    pub fn bang_relay(&self) -> BangRelay {
        self.relay.clone()
    }

    pub(crate) fn context(&self) -> ShellContext {
        ShellContext {
            main_window: self.main_window.0 as usize,
            app_path: self.app_path.clone(),
            rc_path: self.rc.path().to_path_buf(),
        }
    }

    /// Executes one bang command on the dispatch thread.
    pub(crate) fn execute_bang(&mut self, source: usize, command: &str, args: &str) -> isize {
        let Some(action) = self.bangs.resolve(command) else {
            log_debug!("unknown bang {command:?}");
            return 0;
        };

        match action {
            BangAction::Recycle => self.post_recycle(RECYCLE_RECYCLE),
            BangAction::Quit => self.post_recycle(RECYCLE_QUIT),
            BangAction::Logoff => self.post_recycle(RECYCLE_LOGOFF),
            BangAction::SystemShutdown => self.post_recycle(RECYCLE_MSSHUTDOWN),
            BangAction::HideModules => {
                self.message_manager
                    .send_message(LM_HIDEMODULES, source, 0, deliver_to_window);
            }
            BangAction::ShowModules => {
                self.message_manager
                    .send_message(LM_SHOWMODULES, source, 0, deliver_to_window);
            }
            BangAction::ReloadModule if !args.is_empty() => {
                let path = PathBuf::from(args);
                let ctx = self.context();
                self.module_manager.quit_module(&path);
                if let Err(e) = self.module_manager.load_module(&ctx, &path, 0) {
                    log_warn!("{e}");
                }
            }
            BangAction::UnloadModule if !args.is_empty() => {
                self.module_manager.quit_module(&PathBuf::from(args));
            }
            BangAction::ReloadModule | BangAction::UnloadModule => {
                log_warn!("{command} needs a module path");
            }
        }
        1
    }

    /// Queues the recycle-family request instead of acting inline, so
    /// the current handler finishes before the shell reshapes itself.
    fn post_recycle(&self, selector: usize) {
        // SAFETY: posting to our own window.
        unsafe {
            let _ = PostMessageW(
                Some(self.main_window),
                LM_RECYCLE,
                WPARAM(selector),
                LPARAM(0),
            );
        }
    }

    /// Soft restart: modules and settings reload, services and the
    /// main window stay.
    pub(crate) fn recycle(&mut self) {
        // Queued duplicates of the request land here while the first
        // one is still running; they are dropped, not deferred.
        if !self.recycle_guard.begin() {
            self.recycle_guard.end();
            return;
        }

        log_info!("recycle started");
        self.stop_managers();

        if shift_held() {
            // Debug aid: a held shift freezes the world between stop
            // and restart.
            // SAFETY: modal message box on the dispatch thread.
            unsafe {
                MessageBoxW(
                    None,
                    w!("Recycle has been paused, click OK to continue."),
                    MAIN_WINDOW_TITLE,
                    MB_OK | MB_TOPMOST,
                );
            }
        }

        self.bangs.reload();
        if let Err(e) = self.rc.reload() {
            log_warn!("boot file reload failed: {e}");
        }
        self.auto_hide_modules = self.rc.bool("autohidemodules", false);

        self.start_managers();
        log_info!(
            "recycle finished, {} module(s) running",
            self.module_manager.module_count()
        );

        self.recycle_guard.end();
    }

    pub(crate) fn start_managers(&mut self) {
        let ctx = self.context();
        let lines = self.rc.module_lines();
        self.module_manager.start(&ctx, &lines);
    }

    pub(crate) fn stop_managers(&mut self) {
        self.module_manager.stop();
        // Modules might not have cleaned up after themselves.
        self.message_manager.clear_messages();
        self.hook_manager = None;
    }

    /// Drains the cross-thread bang queue. Executing and then
    /// dropping each command is the release half of the handoff.
    pub(crate) fn drain_thread_bangs(&mut self) {
        while let Ok(bang) = self.bang_rx.try_recv() {
            self.execute_bang(bang.source, &bang.command, &bang.args);
        }
    }
}

/// Directory the shell executable lives in.
fn app_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_default()
}

pub(crate) fn shift_held() -> bool {
    // SAFETY: key-state query.
    unsafe { (GetAsyncKeyState(VK_SHIFT.0 as i32) as u16 & 0x8000) != 0 }
}

fn detect_other_shell() -> bool {
    // SAFETY: window lookup only.
    unsafe {
        FindWindowW(w!("Shell_TrayWnd"), None)
            .map(|h| !h.is_invalid())
            .unwrap_or(false)
    }
}

/// Asks whether to continue under another shell. Returns false to
/// abort startup.
fn confirm_run_alongside() -> bool {
    // SAFETY: modal message box before the pump exists; the only
    // blocking prompt in the whole startup path.
    let answer = unsafe {
        MessageBoxW(
            None,
            w!("Another shell is already active.\n\n\
                Running anyway disables the system-shell integrations: icon \
                notifications, the desktop, and some task managers will not \
                work. Set NoShellWarning in step.rc to silence this prompt.\n\n\
                Continue loading?"),
            MAIN_WINDOW_TITLE,
            MB_YESNO | MB_ICONEXCLAMATION | MB_TOPMOST | MB_DEFBUTTON2,
        )
    };
    answer != IDNO
}

/// Tells the window manager to hide windows when they minimize, so
/// minimized apps don't pile up in a corner of the desktop.
fn apply_minimize_policy() {
    // SAFETY: read-modify-write of the minimized-metrics block.
    unsafe {
        let mut mm = MINIMIZEDMETRICS {
            cbSize: mem::size_of::<MINIMIZEDMETRICS>() as u32,
            ..Default::default()
        };
        if SystemParametersInfoW(
            SPI_GETMINIMIZEDMETRICS,
            mm.cbSize,
            Some(&mut mm as *mut MINIMIZEDMETRICS as *mut c_void),
            Default::default(),
        )
        .is_err()
        {
            return;
        }

        if mm.iArrange & ARW_HIDE == 0 {
            mm.iArrange |= ARW_HIDE;
            let _ = SystemParametersInfoW(
                SPI_SETMINIMIZEDMETRICS,
                mm.cbSize,
                Some(&mut mm as *mut MINIMIZEDMETRICS as *mut c_void),
                Default::default(),
            );
        }
    }
}

fn register_window_class() -> bool {
    // SAFETY: class registration against this module.
    unsafe {
        let wc = WNDCLASSW {
            lpfnWndProc: Some(dispatch::main_wndproc),
            lpszClassName: MAIN_WINDOW_CLASS,
            ..Default::default()
        };
        RegisterClassW(&wc) != 0
    }
}

fn unregister_window_class() {
    // SAFETY: balances register_window_class().
    unsafe {
        let _ = UnregisterClassW(MAIN_WINDOW_CLASS, None);
    }
}

fn create_main_window() -> Option<HWND> {
    // SAFETY: hidden tool window, no size, never shown.
    unsafe {
        let hwnd = CreateWindowExW(
            WS_EX_TOOLWINDOW,
            MAIN_WINDOW_CLASS,
            MAIN_WINDOW_TITLE,
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
            Ok(h) if !h.is_invalid() => Some(h),
            _ => None,
        }
    }
}

/// Claims the official shell-window role. The export has no import
/// library, so it is resolved dynamically and skipped when absent.
fn claim_shell_window(hwnd: HWND) {
    // SAFETY: resolving and calling a user32 export with the
    // documented single-window signature.
    unsafe {
        let Ok(user32) = GetModuleHandleW(w!("user32.dll")) else {
            return;
        };
        let Some(proc) = GetProcAddress(user32, s!("SetShellWindow")) else {
            return;
        };
        let set_shell_window = std::mem::transmute::<
            unsafe extern "system" fn() -> isize,
            unsafe extern "system" fn(HWND) -> i32,
        >(proc);
        let _ = set_shell_window(hwnd);
    }
}

