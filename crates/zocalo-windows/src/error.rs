//! Fatal startup error classes.
//!
//! Everything else that can go wrong during startup is logged and
//! degraded; these four abort the process, each with its own exit
//! code so scripts can tell them apart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    /// A required OS subsystem bridge refused to initialize.
    #[error("failed to initialize the OLE/COM subsystem")]
    ApiInit,

    /// The user declined to run alongside an existing shell.
    #[error("startup aborted: another shell is active")]
    Aborted,

    /// The main window class could not be registered.
    #[error("error registering the main shell window class")]
    WindowClass,

    /// The main window could not be created.
    #[error("error creating the main shell window")]
    WindowCreation,
}

impl StartupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ApiInit => 3,
            Self::Aborted => 4,
            Self::WindowClass | Self::WindowCreation => 5,
        }
    }
}
