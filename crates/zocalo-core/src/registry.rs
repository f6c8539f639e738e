//! Per-code subscriber registry for custom window messages.
//!
//! Modules register the message codes they want to receive; the
//! dispatch routine consults this registry for every code it does not
//! handle itself. Delivery is injected as a closure so the registry
//! stays free of platform types.

use std::collections::{BTreeMap, BTreeSet};

use crate::WindowId;

/// Maps message codes to the set of windows subscribed to them.
#[derive(Debug, Default)]
pub struct MessageManager {
    subscribers: BTreeMap<u32, BTreeSet<WindowId>>,
}

impl MessageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `window` to every code in `codes`.
    ///
    /// Adding an already-present pair is a no-op.
    pub fn add_messages(&mut self, window: WindowId, codes: &[u32]) {
        for &code in codes {
            self.subscribers.entry(code).or_default().insert(window);
        }
    }

    /// Removes `window`'s subscription to every code in `codes`.
    ///
    /// Codes whose subscriber set becomes empty are dropped entirely,
    /// so [`handler_exists`](Self::handler_exists) and enumeration only
    /// ever see codes with at least one subscriber.
    pub fn remove_messages(&mut self, window: WindowId, codes: &[u32]) {
        for code in codes {
            if let Some(set) = self.subscribers.get_mut(code) {
                set.remove(&window);
                if set.is_empty() {
                    self.subscribers.remove(code);
                }
            }
        }
    }

    /// Returns whether at least one window is subscribed to `code`.
    pub fn handler_exists(&self, code: u32) -> bool {
        self.subscribers.contains_key(&code)
    }

    /// Delivers a message to every subscriber of `code` via `deliver`.
    ///
    /// Results combine as last-non-zero-wins, which matches what
    /// modules written against a single-subscriber shell expect.
    pub fn send_message(
        &self,
        code: u32,
        wparam: usize,
        lparam: isize,
        mut deliver: impl FnMut(WindowId, u32, usize, isize) -> isize,
    ) -> isize {
        let mut result = 0;
        if let Some(set) = self.subscribers.get(&code) {
            for &window in set {
                let r = deliver(window, code, wparam, lparam);
                if r != 0 {
                    result = r;
                }
            }
        }
        result
    }

    /// Copies the full subscriber set for `code` into `out`.
    ///
    /// Returns false (leaving `out` untouched) when nobody is
    /// subscribed. Used by enumeration-style broadcasts that need the
    /// set up front rather than a fire-and-forget send.
    pub fn windows_for_message(&self, code: u32, out: &mut BTreeSet<WindowId>) -> bool {
        match self.subscribers.get(&code) {
            Some(set) => {
                out.extend(set.iter().copied());
                true
            }
            None => false,
        }
    }

    /// Drops every subscription. Used on recycle.
    pub fn clear_messages(&mut self) {
        self.subscribers.clear();
    }

    /// Number of codes with at least one subscriber.
    pub fn code_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_exists_tracks_subscription_state() {
        let mut mm = MessageManager::new();
        assert!(!mm.handler_exists(9601));

        mm.add_messages(100, &[9601, 9602]);
        assert!(mm.handler_exists(9601));
        assert!(mm.handler_exists(9602));

        mm.remove_messages(100, &[9601]);
        assert!(!mm.handler_exists(9601));
        assert!(mm.handler_exists(9602));
    }

    #[test]
    fn duplicate_subscription_is_idempotent() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.add_messages(100, &[9601]);

        // One removal must be enough to clear the pair.
        mm.remove_messages(100, &[9601]);
        assert!(!mm.handler_exists(9601));
    }

    #[test]
    fn removing_last_subscriber_drops_the_code() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.add_messages(200, &[9601]);

        mm.remove_messages(100, &[9601]);
        assert!(mm.handler_exists(9601));

        mm.remove_messages(200, &[9601]);
        assert_eq!(mm.code_count(), 0);
    }

    #[test]
    fn removing_never_added_pair_is_a_noop() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.remove_messages(200, &[9601]);
        mm.remove_messages(100, &[9999]);
        assert!(mm.handler_exists(9601));
    }

    #[test]
    fn send_message_reaches_every_subscriber() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.add_messages(200, &[9601]);
        mm.add_messages(300, &[9700]);

        let mut seen = Vec::new();
        mm.send_message(9601, 7, 13, |w, code, wp, lp| {
            seen.push((w, code, wp, lp));
            0
        });

        assert_eq!(seen, vec![(100, 9601, 7, 13), (200, 9601, 7, 13)]);
    }

    #[test]
    fn send_message_combines_last_non_zero() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.add_messages(200, &[9601]);
        mm.add_messages(300, &[9601]);

        // Window 200 answers, window 300 stays silent: the non-zero
        // answer survives.
        let result = mm.send_message(9601, 0, 0, |w, _, _, _| if w == 200 { 42 } else { 0 });
        assert_eq!(result, 42);
    }

    #[test]
    fn windows_for_message_reports_presence() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601]);
        mm.add_messages(200, &[9601]);

        let mut out = BTreeSet::new();
        assert!(mm.windows_for_message(9601, &mut out));
        assert_eq!(out.len(), 2);

        let mut none = BTreeSet::new();
        assert!(!mm.windows_for_message(9999, &mut none));
        assert!(none.is_empty());
    }

    #[test]
    fn clear_messages_drops_everything() {
        let mut mm = MessageManager::new();
        mm.add_messages(100, &[9601, 9602]);
        mm.add_messages(200, &[9603]);

        mm.clear_messages();
        assert_eq!(mm.code_count(), 0);
        assert!(!mm.handler_exists(9601));
    }
}
