//! # Periodic Poller
//!
//! Turns repeated [`PerCpuCounter::read`] calls into a stream of snapshots.
//!
//! ## Lifecycle
//!
//! ```text
//! Poller::start ──▶ Running ──┬── cancel() / Poller dropped ──▶ Stopped (Cancelled)
//!                             ├── lookup error ───────────────▶ Stopped (LookupFailed)
//!                             └── stream dropped ─────────────▶ Stopped (ConsumerGone)
//! ```
//!
//! One tokio task per poller owns the counter, and with it the map descriptor
//! and scratch buffer. Ticks run strictly one after another. Snapshots go
//! through a channel of capacity 1, so a slow consumer holds back the next
//! tick instead of letting stale snapshots pile up. The descriptor is closed
//! when the task ends.

use log::{info, warn};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::percpu::{PerCpuCounter, Snapshot};
use crate::bpf::Syscall;
use crate::domain::{MapError, PollerError};

/// Why a poll loop ended
#[derive(Debug)]
pub enum StopReason {
    /// `cancel()` was called or the [`Poller`] handle was dropped
    Cancelled,
    /// A lookup failed; the map is gone or no longer readable
    LookupFailed(MapError),
    /// The [`SnapshotStream`] was dropped
    ConsumerGone,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::LookupFailed(err) => write!(f, "lookup failed: {err}"),
            StopReason::ConsumerGone => f.write_str("consumer gone"),
        }
    }
}

/// Receiving end of a poller: snapshots in tick order
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::Receiver<Snapshot>,
}

impl SnapshotStream {
    /// Next snapshot, or `None` once the poller has stopped
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }
}

/// Handle on a running poll loop
#[derive(Debug)]
pub struct Poller {
    cancel: watch::Sender<bool>,
    task: JoinHandle<StopReason>,
}

impl Poller {
    /// Spawn the poll loop on the current tokio runtime.
    ///
    /// The first read happens one `interval` after start.
    ///
    /// # Errors
    /// [`PollerError::ZeroInterval`]; nothing is spawned in that case
    pub fn start<S>(
        counter: PerCpuCounter<S>,
        interval: Duration,
    ) -> Result<(Self, SnapshotStream), PollerError>
    where
        S: Syscall + 'static,
    {
        if interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        let (tx, rx) = mpsc::channel(1);
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(poll_loop(counter, interval, tx, cancelled));

        Ok((Self { cancel, task }, SnapshotStream { rx }))
    }

    /// Ask the loop to stop. Takes effect at the next tick or hand-off.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end on its own
    pub async fn join(self) -> StopReason {
        let Self { cancel, task } = self;
        let reason = match task.await {
            Ok(reason) => reason,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => StopReason::Cancelled,
        };
        drop(cancel);
        reason
    }

    /// Cancel and wait for the loop to end
    pub async fn stop(self) -> StopReason {
        self.cancel();
        self.join().await
    }
}

async fn poll_loop<S: Syscall>(
    mut counter: PerCpuCounter<S>,
    period: Duration,
    tx: mpsc::Sender<Snapshot>,
    mut cancelled: watch::Receiver<bool>,
) -> StopReason {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u64 = 0;

    let reason = loop {
        tokio::select! {
            biased;
            _ = cancelled.changed() => break StopReason::Cancelled,
            () = tx.closed() => break StopReason::ConsumerGone,
            _ = ticker.tick() => {}
        }

        let snapshot = match counter.read() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("stopping poll of {}: {err}", counter.path().display());
                break StopReason::LookupFailed(err);
            }
        };
        ticks += 1;

        // A free slot takes the snapshot right away, even if cancellation
        // arrived meanwhile; only a blocked hand-off is abandoned.
        tokio::select! {
            biased;
            sent = tx.send(snapshot) => {
                if sent.is_err() {
                    break StopReason::ConsumerGone;
                }
            }
            _ = cancelled.changed() => break StopReason::Cancelled,
        }
    };

    info!("poller for {} stopped after {ticks} ticks: {reason}", counter.path().display());
    reason
}
