//! Long-lived helper services.
//!
//! A closed set of variants with a uniform start/stop/release
//! lifecycle, held in an ordered list. Start order follows the list;
//! stop and release walk it backwards so later services can lean on
//! earlier ones for their whole lifetime. The service internals are
//! deliberately thin — the shell only brokers their lifecycle.

mod legacy_ipc;
mod tray;

pub use legacy_ipc::{LegacyIpcMode, LegacyIpcService};
pub use tray::TrayService;

use zocalo_core::config::RcFile;
use zocalo_core::log_warn;

/// One owned service.
pub enum ServiceSlot {
    LegacyIpc(LegacyIpcService),
    Tray(TrayService),
}

impl ServiceSlot {
    fn name(&self) -> &'static str {
        match self {
            Self::LegacyIpc(_) => "legacy-ipc",
            Self::Tray(_) => "tray",
        }
    }

    fn start(&mut self) -> zocalo_core::ShellResult<()> {
        match self {
            Self::LegacyIpc(s) => s.start(),
            Self::Tray(s) => s.start(),
        }
    }

    fn stop(&mut self) {
        match self {
            Self::LegacyIpc(s) => s.stop(),
            Self::Tray(s) => s.stop(),
        }
    }
}

/// Ordered list of services owned by the shell.
pub struct ServiceRegistry {
    slots: Vec<ServiceSlot>,
}

impl ServiceRegistry {
    /// Builds the service list from boot-file switches.
    ///
    /// The legacy IPC bridge always exists, either as the stub that
    /// defers to the system implementation or as the full bridge. The
    /// tray notifier can be switched off entirely.
    pub fn from_rc(rc: &RcFile) -> Self {
        let mut slots = Vec::new();

        let mode = if rc.bool("systemlegacyipc", true) {
            LegacyIpcMode::Stub
        } else {
            LegacyIpcMode::Full
        };
        slots.push(ServiceSlot::LegacyIpc(LegacyIpcService::new(mode)));

        if !rc.bool("disabletrayservice", false) {
            slots.push(ServiceSlot::Tray(TrayService::new()));
        }

        Self { slots }
    }

    /// Starts every service in list order. Errors are logged, never
    /// fatal.
    pub fn start_all(&mut self) {
        for slot in &mut self.slots {
            if let Err(e) = slot.start() {
                log_warn!("service {} failed to start: {e}", slot.name());
            }
        }
    }

    /// Stops every service in reverse start order.
    pub fn stop_all(&mut self) {
        for slot in self.slots.iter_mut().rev() {
            slot.stop();
        }
    }

    /// Releases every service, newest first.
    pub fn release_all(&mut self) {
        while self.slots.pop().is_some() {}
    }

    /// The tray notifier, when enabled.
    pub fn tray_mut(&mut self) -> Option<&mut TrayService> {
        self.slots.iter_mut().find_map(|slot| match slot {
            ServiceSlot::Tray(t) => Some(t),
            _ => None,
        })
    }
}
