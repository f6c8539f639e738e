/// Window procedure and per-message dispatch.
mod dispatch;

/// Fatal startup error classes.
mod error;

/// Full-screen window probing.
mod fullscreen;

/// WinEvent hook backend.
mod hooks;

/// Running-instance detection and one-shot command forwarding.
pub mod instance;

/// Monitor bounds and work-area queries.
mod monitor;

/// Module loader variants.
pub mod modules;

/// The main message pump.
mod pump;

/// Recovery watchdog thread.
mod recovery;

/// Cross-thread bang-command handoff.
pub mod relay;

/// Long-lived helper services.
pub mod services;

/// Shell object and lifecycle.
pub mod shell;

/// Startup-item runner.
mod startup;

pub use error::StartupError;
pub use shell::{Shell, run};
