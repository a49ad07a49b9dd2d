//! Cooperative stop token shared between the signal listener and the run loop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Why an external stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Polite termination request (SIGTERM)
    Terminate,
    /// Any other asynchronous signal (SIGINT, SIGQUIT, SIGHUP)
    Signal,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Terminate => write!(f, "terminate"),
            StopReason::Signal => write!(f, "signal"),
        }
    }
}

const RUNNING: u8 = 0;
const TERMINATE: u8 = 1;
const SIGNAL: u8 = 2;

/// Cheap clonable handle; every clone observes the same request.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    state: Arc<AtomicU8>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stop request. The first reason wins.
    pub fn request(&self, reason: StopReason) {
        let value = match reason {
            StopReason::Terminate => TERMINATE,
            StopReason::Signal => SIGNAL,
        };
        let _ = self
            .state
            .compare_exchange(RUNNING, value, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.state.load(Ordering::SeqCst) != RUNNING
    }

    pub fn reason(&self) -> Option<StopReason> {
        match self.state.load(Ordering::SeqCst) {
            TERMINATE => Some(StopReason::Terminate),
            SIGNAL => Some(StopReason::Signal),
            _ => None,
        }
    }
}
