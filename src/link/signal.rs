//! Shared "link lost" flag.
//!
//! Raised by the transmitter when sends exhaust their retries and by the
//! monitor when a liveness poll fails; cleared on a successful (re)connect.
//! Observers (a status line, a UI) subscribe through a `watch` channel.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Observed state of the radio link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Up,
    Lost,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Up => f.write_str("up"),
            LinkState::Lost => f.write_str("lost"),
        }
    }
}

/// Cloneable handle on the link-lost flag
#[derive(Debug, Clone)]
pub struct LinkSignal {
    tx: Arc<watch::Sender<LinkState>>,
}

impl Default for LinkSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LinkState::Up);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver that wakes on every transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> LinkState {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.current() == LinkState::Lost
    }

    /// Set the state, notifying subscribers only when it changes.
    ///
    /// Returns true on a transition.
    pub fn set(&self, state: LinkState) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            match state {
                LinkState::Lost => warn!("Radio link lost"),
                LinkState::Up => info!("Radio link up"),
            }
        }
        changed
    }

    pub fn raise_lost(&self) -> bool {
        self.set(LinkState::Lost)
    }

    pub fn clear(&self) -> bool {
        self.set(LinkState::Up)
    }
}
