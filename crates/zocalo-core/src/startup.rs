//! Startup-item run-mode resolution.

/// How the command line asked for startup items to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    /// No flag given: defer to the modifier key and configuration.
    #[default]
    Default,
    /// `-startup`: run items regardless of key or configuration.
    ForceRun,
    /// `-nostartup`: never run items.
    DontRun,
}

/// Decides whether the startup-item runner thread launches.
///
/// Precedence: an explicit force flag wins over everything, then the
/// held modifier key suppresses, then the boot-file default applies
/// (items are suppressed unless the configuration opts in).
pub fn should_run_startup(mode: StartupMode, shift_held: bool, rc_suppress: bool) -> bool {
    match mode {
        StartupMode::ForceRun => true,
        StartupMode::DontRun => false,
        StartupMode::Default => !shift_held && !rc_suppress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nostartup_never_runs() {
        assert!(!should_run_startup(StartupMode::DontRun, false, false));
        assert!(!should_run_startup(StartupMode::DontRun, true, true));
    }

    #[test]
    fn force_overrides_the_key_suppress_check() {
        assert!(should_run_startup(StartupMode::ForceRun, true, true));
        assert!(should_run_startup(StartupMode::ForceRun, false, true));
    }

    #[test]
    fn default_mode_honors_key_and_configuration() {
        assert!(should_run_startup(StartupMode::Default, false, false));
        assert!(!should_run_startup(StartupMode::Default, true, false));
        assert!(!should_run_startup(StartupMode::Default, false, true));
    }
}
