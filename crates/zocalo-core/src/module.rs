//! The pluggable-module subsystem.
//!
//! A module is an isolated unit of shell functionality loaded from a
//! file at runtime. Three variants exist — a native library and two
//! managed-runtime hosts — selected by mutually exclusive flag bits.
//! The manager owns every loaded module, keyed by path and by load
//! handle, and drives the bulk start/stop cycle on shell startup and
//! recycle. Actual loading is behind [`ModuleFactory`] so the manager
//! itself stays platform-free and testable.

use std::fmt;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ShellResult;

/// Flag bit: host the module in the legacy managed runtime.
pub const MODULE_CLR: u32 = 0x0001;
/// Flag bit: host the module in the self-contained managed runtime.
pub const MODULE_CORECLR: u32 = 0x0002;

/// Which loader a set of flags selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Native,
    Clr,
    CoreClr,
}

impl ModuleKind {
    /// Pure factory selector. Unset flags mean native.
    pub fn from_flags(flags: u32) -> Self {
        if flags & MODULE_CLR != 0 {
            Self::Clr
        } else if flags & MODULE_CORECLR != 0 {
            Self::CoreClr
        } else {
            Self::Native
        }
    }
}

/// What the shell hands each module at start.
#[derive(Debug, Clone)]
pub struct ShellContext {
    /// The shell's main window handle.
    pub main_window: usize,
    /// Directory the shell executable lives in.
    pub app_path: PathBuf,
    /// Path of the boot configuration file.
    pub rc_path: PathBuf,
}

/// Uniform capability every module variant satisfies.
pub trait Module {
    /// Starts the module. A module that fails to start is unloaded.
    fn start(&mut self, ctx: &ShellContext) -> ShellResult<()>;

    /// Stops the module. Must be safe to call once after a successful
    /// start.
    fn stop(&mut self);

    /// The load handle identifying this instance, unique while loaded.
    fn handle(&self) -> usize;
}

/// Creates module instances for the manager.
pub trait ModuleFactory {
    fn create(&self, path: &Path, flags: u32) -> ShellResult<Box<dyn Module>>;
}

/// Errors from module load/unload operations.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module already loaded: {0}")]
    AlreadyLoaded(PathBuf),
    #[error("module not found")]
    NotFound,
    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
}

/// One `loadmodule` line from the boot file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleLine {
    pub path: PathBuf,
    pub flags: u32,
}

impl ModuleLine {
    /// Parses `<path> [clr|coreclr]` as it appears in `step.rc`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace();
        let path = PathBuf::from(parts.next()?);
        let flags = match parts.next() {
            Some(tag) if tag.eq_ignore_ascii_case("clr") => MODULE_CLR,
            Some(tag) if tag.eq_ignore_ascii_case("coreclr") => MODULE_CORECLR,
            _ => 0,
        };
        Some(Self { path, flags })
    }
}

struct LoadedModule {
    path: PathBuf,
    flags: u32,
    module: Box<dyn Module>,
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("handle", &self.module.handle())
            .finish()
    }
}

/// Owns the set of loaded modules in insertion order.
pub struct ModuleManager {
    factory: Box<dyn ModuleFactory>,
    modules: Vec<LoadedModule>,
}

impl ModuleManager {
    pub fn new(factory: Box<dyn ModuleFactory>) -> Self {
        Self {
            factory,
            modules: Vec::new(),
        }
    }

    /// Loads and starts the module at `path`.
    ///
    /// Loading a path that is already loaded is rejected; callers that
    /// want fresh state go through [`reload_module`](Self::reload_module)
    /// or an unload/load pair.
    pub fn load_module(
        &mut self,
        ctx: &ShellContext,
        path: &Path,
        flags: u32,
    ) -> Result<(), ModuleError> {
        if self.modules.iter().any(|m| m.path == path) {
            return Err(ModuleError::AlreadyLoaded(path.to_path_buf()));
        }

        let mut module = self
            .factory
            .create(path, flags)
            .map_err(|e| ModuleError::LoadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        module.start(ctx).map_err(|e| ModuleError::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.modules.push(LoadedModule {
            path: path.to_path_buf(),
            flags,
            module,
        });
        Ok(())
    }

    /// Stops and removes the module loaded from `path`.
    ///
    /// Exact match only. Returns false when no such module is loaded.
    pub fn quit_module(&mut self, path: &Path) -> bool {
        match self.modules.iter().position(|m| m.path == path) {
            Some(i) => {
                let mut entry = self.modules.remove(i);
                entry.module.stop();
                true
            }
            None => false,
        }
    }

    /// Stops and removes the module with the given load handle.
    pub fn quit_module_by_handle(&mut self, handle: usize) -> bool {
        match self.modules.iter().position(|m| m.module.handle() == handle) {
            Some(i) => {
                let mut entry = self.modules.remove(i);
                entry.module.stop();
                true
            }
            None => false,
        }
    }

    /// Quit-then-load convenience for the module owning `handle`.
    pub fn reload_module(&mut self, ctx: &ShellContext, handle: usize) -> Result<(), ModuleError> {
        let entry = self
            .modules
            .iter()
            .find(|m| m.module.handle() == handle)
            .ok_or(ModuleError::NotFound)?;

        let path = entry.path.clone();
        let flags = entry.flags;

        self.quit_module_by_handle(handle);
        self.load_module(ctx, &path, flags)
    }

    /// Invokes `callback` for each loaded module in insertion order.
    ///
    /// The callback may break to stop early; the return value is the
    /// number of entries visited.
    pub fn enum_modules(
        &self,
        mut callback: impl FnMut(&Path, u32) -> ControlFlow<()>,
    ) -> usize {
        let mut visited = 0;
        for entry in &self.modules {
            visited += 1;
            if callback(&entry.path, entry.flags).is_break() {
                break;
            }
        }
        visited
    }

    /// Bulk start: loads every configured module.
    ///
    /// Individual failures are logged and skipped; one broken module
    /// must not keep the rest of the shell from coming up. Returns the
    /// number of modules running afterwards.
    pub fn start(&mut self, ctx: &ShellContext, lines: &[ModuleLine]) -> usize {
        for line in lines {
            if let Err(e) = self.load_module(ctx, &line.path, line.flags) {
                crate::log_warn!("{e}");
            }
        }
        self.modules.len()
    }

    /// Bulk stop: unloads every module, newest first.
    pub fn stop(&mut self) {
        while let Some(mut entry) = self.modules.pop() {
            entry.module.stop();
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod module_tests;
