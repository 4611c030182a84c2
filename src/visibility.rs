//! Foreground/background signal shared by the whole process.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

const TRANSITION_CAPACITY: usize = 32;

struct SignalInner {
    hidden: Mutex<bool>,
    transitions: broadcast::Sender<bool>,
}

/// Clonable handle; every clone drives and observes the same signal.
///
/// Subscribers receive every transition in order, so a quick hide and show
/// still reaches them as two changes.
#[derive(Clone)]
pub struct VisibilitySignal {
    inner: Arc<SignalInner>,
}

impl VisibilitySignal {
    pub fn new() -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            inner: Arc::new(SignalInner {
                hidden: Mutex::new(false),
                transitions,
            }),
        }
    }

    /// Returns whether the value flipped. Repeated values are not sent.
    pub fn set_hidden(&self, hidden: bool) -> bool {
        let mut current = self
            .inner
            .hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current == hidden {
            return false;
        }
        *current = hidden;
        // Sent under the lock so subscribers see transitions in order.
        let _ = self.inner.transitions.send(hidden);
        true
    }

    pub fn is_hidden(&self) -> bool {
        *self
            .inner
            .hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.inner.transitions.subscribe()
    }
}

impl Default for VisibilitySignal {
    fn default() -> Self {
        Self::new()
    }
}
