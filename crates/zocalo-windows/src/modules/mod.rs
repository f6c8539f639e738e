//! Module loader variants.
//!
//! Three closed variants satisfy the uniform module capability: a
//! native library, and two managed-runtime hosts whose bootstrap
//! libraries expose runtime-specific entry points. Which one a load
//! request gets is a pure function of its flag bits, decided in
//! `zocalo_core::module::ModuleKind`.

mod host;

use std::path::Path;

use windows::core::s;

use zocalo_core::module::{Module, ModuleFactory, ModuleKind, ShellContext};
use zocalo_core::ShellResult;

use host::DllHost;

/// A module implemented as a plain native library.
pub struct NativeModule {
    host: DllHost,
}

impl NativeModule {
    pub fn load(path: &Path) -> ShellResult<Self> {
        Ok(Self {
            host: DllHost::load(path, s!("initModuleW"), s!("quitModule"))?,
        })
    }
}

impl Module for NativeModule {
    fn start(&mut self, ctx: &ShellContext) -> ShellResult<()> {
        self.host.start(ctx)
    }

    fn stop(&mut self) {
        self.host.stop();
    }

    fn handle(&self) -> usize {
        self.host.handle()
    }
}

/// A module hosted in the legacy managed runtime. The bootstrap
/// library brings the runtime up inside its init entry point.
pub struct ClrModule {
    host: DllHost,
}

impl ClrModule {
    pub fn load(path: &Path) -> ShellResult<Self> {
        Ok(Self {
            host: DllHost::load(path, s!("initClrHostW"), s!("quitClrHost"))?,
        })
    }
}

impl Module for ClrModule {
    fn start(&mut self, ctx: &ShellContext) -> ShellResult<()> {
        self.host.start(ctx)
    }

    fn stop(&mut self) {
        self.host.stop();
    }

    fn handle(&self) -> usize {
        self.host.handle()
    }
}

/// A module hosted in the self-contained managed runtime.
pub struct CoreClrModule {
    host: DllHost,
}

impl CoreClrModule {
    pub fn load(path: &Path) -> ShellResult<Self> {
        Ok(Self {
            host: DllHost::load(path, s!("initCoreHostW"), s!("quitCoreHost"))?,
        })
    }
}

impl Module for CoreClrModule {
    fn start(&mut self, ctx: &ShellContext) -> ShellResult<()> {
        self.host.start(ctx)
    }

    fn stop(&mut self) {
        self.host.stop();
    }

    fn handle(&self) -> usize {
        self.host.handle()
    }
}

/// The factory the module manager is constructed with.
pub struct WinModuleFactory;

impl ModuleFactory for WinModuleFactory {
    fn create(&self, path: &Path, flags: u32) -> ShellResult<Box<dyn Module>> {
        match ModuleKind::from_flags(flags) {
            ModuleKind::Native => Ok(Box::new(NativeModule::load(path)?)),
            ModuleKind::Clr => Ok(Box::new(ClrModule::load(path)?)),
            ModuleKind::CoreClr => Ok(Box::new(CoreClrModule::load(path)?)),
        }
    }
}
