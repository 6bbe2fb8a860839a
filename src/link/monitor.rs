//! # Connection Monitor
//!
//! Polls link liveness on a fixed period and mirrors it into the
//! [`LinkSignal`]. Advisory only: it never reconnects, that is left to the
//! next failing send in the [`Transmitter`].

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::signal::LinkState;
use super::transmitter::Transmitter;

/// Periodic liveness poller
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    transmitter: Arc<Transmitter>,
    period: Duration,
}

impl ConnectionMonitor {
    #[must_use]
    pub fn new(transmitter: Arc<Transmitter>, period: Duration) -> Self {
        Self { transmitter, period }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check liveness once and update the signal
    pub fn poll_once(&self) -> LinkState {
        let state = if self.transmitter.is_alive() {
            LinkState::Up
        } else {
            LinkState::Lost
        };
        self.transmitter.signal().set(state);
        state
    }

    /// Run the poll loop on its own task
    ///
    /// The first poll happens one period after spawning; the connect that
    /// precedes it has already set the signal.
    #[must_use]
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // interval yields immediately on the first tick
            ticker.tick().await;

            debug!("Connection monitor started ({:?} period)", self.period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.poll_once();
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            debug!("Connection monitor stopped");
        });

        MonitorHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running [`ConnectionMonitor`]; stops the task on shutdown
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the poll loop and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Connection monitor task failed: {}", e);
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
