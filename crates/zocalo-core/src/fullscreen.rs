//! Full-screen ("rude app") detection state machine.
//!
//! The shell-hook activation notification carries a bit meaning "some
//! full-screen app exists system-wide", but not whether the activated
//! window itself is the one. The machine therefore probes the window's
//! geometry immediately, and when that is ambiguous (the window may
//! still be animating into place) asks the caller to arm a one-shot
//! timer and re-probe the foreground window later.
//!
//! The machine is pure: the platform layer supplies probe results and
//! applies the returned effects (timer control, tray notification,
//! hide/show-modules broadcasts).

/// Detection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsState {
    /// No full-screen app is believed to be running.
    Normal,
    /// The rude-app bit is set but no window confirmed it yet; a
    /// re-probe timer should be pending.
    Suspected,
    /// A full-screen app is confirmed in the foreground.
    Confirmed,
}

/// Confirmed-state transitions the caller must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsChange {
    /// A full-screen app took over: notify the tray, hide modules.
    Entered,
    /// The full-screen app went away: show modules again.
    Left,
}

/// Effects of one activation notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub change: Option<FsChange>,
    /// Arm the one-shot re-probe timer. Any pending timer is always
    /// cancelled first, whether or not a new one is armed.
    pub arm_timer: bool,
}

/// Tracks the rude-app bit and the confirmed/suspected state.
#[derive(Debug)]
pub struct FullScreenMonitor {
    state: FsState,
    rude_bit: bool,
}

impl Default for FullScreenMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FullScreenMonitor {
    pub fn new() -> Self {
        Self {
            state: FsState::Normal,
            rude_bit: false,
        }
    }

    pub fn state(&self) -> FsState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state() == FsState::Confirmed
    }

    /// Feeds one window-activation notification into the machine.
    ///
    /// `rude_flag` is the hook's system-wide full-screen bit;
    /// `window_full_screen` is the probe result for the activated
    /// window itself.
    pub fn on_window_activated(&mut self, rude_flag: bool, window_full_screen: bool) -> Activation {
        self.rude_bit = rude_flag;
        let was_confirmed = self.is_confirmed();
        let mut change = None;

        if rude_flag && !was_confirmed {
            if window_full_screen {
                self.state = FsState::Confirmed;
                change = Some(FsChange::Entered);
            }
        } else if was_confirmed && (!rude_flag || !window_full_screen) {
            self.state = FsState::Normal;
            change = Some(FsChange::Left);
        }

        // Told there is a rude app but none detected: re-check the
        // foreground window once the dust settles.
        let arm_timer = rude_flag && !self.is_confirmed();
        if arm_timer {
            self.state = FsState::Suspected;
        }

        Activation { change, arm_timer }
    }

    /// Feeds the deferred re-probe result in. The caller kills the
    /// timer after this regardless of outcome.
    pub fn on_timer(&mut self, foreground_full_screen: bool) -> Option<FsChange> {
        if !self.rude_bit {
            if self.state() == FsState::Suspected {
                self.state = FsState::Normal;
            }
            return None;
        }

        let confirmed = self.is_confirmed();
        if confirmed != foreground_full_screen {
            if foreground_full_screen {
                self.state = FsState::Confirmed;
                Some(FsChange::Entered)
            } else {
                self.state = FsState::Normal;
                Some(FsChange::Left)
            }
        } else {
            if self.state() == FsState::Suspected {
                self.state = FsState::Normal;
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_immediately_when_probe_matches() {
        let mut fs = FullScreenMonitor::new();
        let act = fs.on_window_activated(true, true);

        assert_eq!(act.change, Some(FsChange::Entered));
        assert!(!act.arm_timer);
        assert_eq!(fs.state(), FsState::Confirmed);
    }

    #[test]
    fn ambiguous_activation_arms_the_timer() {
        let mut fs = FullScreenMonitor::new();
        let act = fs.on_window_activated(true, false);

        assert_eq!(act.change, None);
        assert!(act.arm_timer);
        assert_eq!(fs.state(), FsState::Suspected);
    }

    #[test]
    fn timer_confirms_a_suspected_app() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(true, false);

        assert_eq!(fs.on_timer(true), Some(FsChange::Entered));
        assert_eq!(fs.state(), FsState::Confirmed);
    }

    #[test]
    fn timer_clears_a_false_suspicion() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(true, false);

        assert_eq!(fs.on_timer(false), None);
        assert_eq!(fs.state(), FsState::Normal);
    }

    #[test]
    fn clearing_the_flag_leaves_confirmed_state() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(true, true);

        let act = fs.on_window_activated(false, false);
        assert_eq!(act.change, Some(FsChange::Left));
        assert!(!act.arm_timer);
        assert_eq!(fs.state(), FsState::Normal);
    }

    #[test]
    fn switching_between_two_full_screen_apps_stays_confirmed() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(true, true);

        // Another full-screen window activates: no duplicate Entered.
        let act = fs.on_window_activated(true, true);
        assert_eq!(act.change, None);
        assert!(!act.arm_timer);
        assert_eq!(fs.state(), FsState::Confirmed);
    }

    #[test]
    fn confirmed_then_normal_window_leaves_once() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(true, true);

        // Rude bit still set system-wide, but the activated window is
        // an ordinary one: leave confirmed state and re-arm the timer.
        let act = fs.on_window_activated(true, false);
        assert_eq!(act.change, Some(FsChange::Left));
        assert!(act.arm_timer);
    }

    #[test]
    fn timer_without_rude_bit_does_nothing() {
        let mut fs = FullScreenMonitor::new();
        fs.on_window_activated(false, false);
        assert_eq!(fs.on_timer(true), None);
        assert_eq!(fs.state(), FsState::Normal);
    }
}
