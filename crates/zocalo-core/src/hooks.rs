//! Lazily-lived hook subscription manager.
//!
//! Modules subscribe windows to classes of system-wide events. The
//! manager exists only while it has subscribers: the first
//! registration engages exactly one OS-level hook through the
//! [`HookBackend`], and unregistering the last subscription releases
//! it again. However many logical subscriptions churn through, the
//! backend is engaged at most once at a time.

use std::collections::{BTreeMap, BTreeSet};

use crate::{ShellResult, WindowId};

/// The single OS-level registration backing all subscriptions.
pub trait HookBackend {
    /// Installs the OS hook. Called once when the manager starts.
    fn engage(&mut self) -> ShellResult<()>;

    /// Removes the OS hook. Called once when the manager stops.
    fn release(&mut self);
}

/// Tracks (event class → subscriber windows) while engaged.
pub struct HookManager<B: HookBackend> {
    backend: B,
    subscribers: BTreeMap<u32, BTreeSet<WindowId>>,
}

impl<B: HookBackend> HookManager<B> {
    /// Engages the backend and returns a running manager.
    pub fn start(mut backend: B) -> ShellResult<Self> {
        backend.engage()?;
        Ok(Self {
            backend,
            subscribers: BTreeMap::new(),
        })
    }

    /// Subscribes `window` to `class`. Idempotent.
    pub fn register(&mut self, window: WindowId, class: u32) {
        self.subscribers.entry(class).or_default().insert(window);
    }

    /// Removes one subscription and returns how many remain in total.
    ///
    /// The owner drops the manager when this reaches zero, which
    /// releases the OS hook via [`Drop`].
    pub fn unregister(&mut self, window: WindowId, class: u32) -> usize {
        if let Some(set) = self.subscribers.get_mut(&class) {
            set.remove(&window);
            if set.is_empty() {
                self.subscribers.remove(&class);
            }
        }
        self.subscription_count()
    }

    /// Total number of live (window, class) subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscribers.values().map(BTreeSet::len).sum()
    }

    /// Fans one hook event out to every subscriber of its class.
    pub fn dispatch(
        &self,
        class: u32,
        wparam: usize,
        lparam: isize,
        mut deliver: impl FnMut(WindowId, u32, usize, isize),
    ) {
        if let Some(set) = self.subscribers.get(&class) {
            for &window in set {
                deliver(window, class, wparam, lparam);
            }
        }
    }
}

impl<B: HookBackend> Drop for HookManager<B> {
    fn drop(&mut self) {
        self.backend.release();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct BackendState {
        engaged: bool,
        engage_calls: u32,
        release_calls: u32,
    }

    struct FakeBackend(Rc<RefCell<BackendState>>);

    impl HookBackend for FakeBackend {
        fn engage(&mut self) -> ShellResult<()> {
            let mut s = self.0.borrow_mut();
            s.engaged = true;
            s.engage_calls += 1;
            Ok(())
        }

        fn release(&mut self) {
            let mut s = self.0.borrow_mut();
            s.engaged = false;
            s.release_calls += 1;
        }
    }

    #[test]
    fn start_engages_and_drop_releases() {
        let state = Rc::new(RefCell::new(BackendState::default()));
        let mgr = HookManager::start(FakeBackend(state.clone())).unwrap();
        assert!(state.borrow().engaged);

        drop(mgr);
        let s = state.borrow();
        assert!(!s.engaged);
        assert_eq!(s.engage_calls, 1);
        assert_eq!(s.release_calls, 1);
    }

    #[test]
    fn subscription_count_tracks_churn() {
        let state = Rc::new(RefCell::new(BackendState::default()));
        let mut mgr = HookManager::start(FakeBackend(state)).unwrap();

        mgr.register(100, 3);
        mgr.register(100, 3); // idempotent
        mgr.register(200, 3);
        mgr.register(100, 4);
        assert_eq!(mgr.subscription_count(), 3);

        assert_eq!(mgr.unregister(100, 3), 2);
        assert_eq!(mgr.unregister(200, 3), 1);
        assert_eq!(mgr.unregister(100, 4), 0);
    }

    #[test]
    fn repeated_manager_lifetimes_do_not_leak_registrations() {
        let state = Rc::new(RefCell::new(BackendState::default()));

        for _ in 0..3 {
            let mut mgr = HookManager::start(FakeBackend(state.clone())).unwrap();
            mgr.register(100, 3);
            assert_eq!(mgr.unregister(100, 3), 0);
            drop(mgr);
        }

        let s = state.borrow();
        assert_eq!(s.engage_calls, 3);
        assert_eq!(s.release_calls, 3);
        assert!(!s.engaged);
    }

    #[test]
    fn dispatch_reaches_only_the_event_class() {
        let state = Rc::new(RefCell::new(BackendState::default()));
        let mut mgr = HookManager::start(FakeBackend(state)).unwrap();
        mgr.register(100, 3);
        mgr.register(200, 3);
        mgr.register(300, 5);

        let mut seen = Vec::new();
        mgr.dispatch(3, 1, 2, |w, class, wp, lp| seen.push((w, class, wp, lp)));
        assert_eq!(seen, vec![(100, 3, 1, 2), (200, 3, 1, 2)]);
    }
}
