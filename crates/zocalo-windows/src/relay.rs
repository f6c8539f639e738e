//! Cross-thread bang-command handoff.
//!
//! Worker threads inside services and modules may not touch shell
//! state; the one sanctioned way to run a bang on the dispatch thread
//! is to enqueue it here. Ownership of the queued command transfers
//! into the channel, the pump drains the queue when the wake message
//! arrives, and each command is executed and dropped exactly once.

use std::sync::mpsc::{Receiver, Sender, channel};

use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::PostThreadMessageW;

use zocalo_core::messages::LM_THREAD_BANGCOMMAND;

/// One bang command waiting for the dispatch thread.
#[derive(Debug)]
pub struct QueuedBang {
    /// Window the command nominally originates from; 0 for none.
    pub source: usize,
    pub command: String,
    pub args: String,
}

/// Producer handle, clonable into any thread.
#[derive(Clone)]
pub struct BangRelay {
    tx: Sender<QueuedBang>,
    pump_thread: u32,
}

impl BangRelay {
    /// Queues a bang and wakes the pump with a thread message.
    ///
    /// Returns false when the shell is shutting down and the queue is
    /// gone; the command is dropped in that case.
    pub fn post(&self, source: usize, command: &str, args: &str) -> bool {
        if self
            .tx
            .send(QueuedBang {
                source,
                command: command.to_string(),
                args: args.to_string(),
            })
            .is_err()
        {
            return false;
        }

        // SAFETY: PostThreadMessageW only places a message on the pump
        // thread's queue; no pointers cross the boundary, the payload
        // already lives in the channel.
        unsafe {
            PostThreadMessageW(self.pump_thread, LM_THREAD_BANGCOMMAND, WPARAM(0), LPARAM(0))
                .is_ok()
        }
    }
}

/// Builds the relay pair for a pump running on `pump_thread`.
pub fn bang_channel(pump_thread: u32) -> (BangRelay, Receiver<QueuedBang>) {
    let (tx, rx) = channel();
    (BangRelay { tx, pump_thread }, rx)
}
