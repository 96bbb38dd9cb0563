//! # ip-hist - Main Entry Point
//!
//! Supports two operational modes:
//! - **Live TUI** (default): per-CPU line chart, redrawn on every snapshot
//! - **Headless** (`--headless`): one JSON line per snapshot on stdout

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, info};
use serde::Serialize;
use std::io::{self, Write};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::oneshot;

use ip_hist::cli::Args;
use ip_hist::counter::{PerCpuCounter, Poller, Snapshot, StopReason};
use ip_hist::domain::{Errno, MapError};
use ip_hist::tui;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

/// Snapshots buffered for the dashboard thread; new ones are dropped while it is full
const DASHBOARD_BACKLOG: usize = 16;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let denied = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<MapError>())
        .filter_map(MapError::errno)
        .any(Errno::is_permission_denied);
    if denied {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

#[derive(Serialize)]
struct SnapshotLine<'a> {
    tick: u64,
    total: u64,
    per_cpu: &'a Snapshot,
}

fn write_json_line(out: &mut impl Write, tick: u64, snapshot: &Snapshot) -> Result<()> {
    let line = SnapshotLine { tick, total: snapshot.total(), per_cpu: snapshot };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Outcome of handing one snapshot to the dashboard thread
#[derive(Debug, PartialEq, Eq)]
enum Forward {
    Sent,
    /// The backlog was full; this (newest) snapshot was discarded
    Dropped,
    Closed,
}

fn forward(tx: &Sender<Snapshot>, snapshot: Snapshot) -> Forward {
    match tx.try_send(snapshot) {
        Ok(()) => Forward::Sent,
        Err(TrySendError::Full(_)) => {
            debug!("dashboard backlog full, dropping snapshot");
            Forward::Dropped
        }
        Err(TrySendError::Disconnected(_)) => Forward::Closed,
    }
}

/// Run `body` on its own thread. The receiver resolves as soon as `body`
/// returns or panics, so the async side never waits for another snapshot to
/// notice the thread is gone.
fn spawn_with_exit_signal<F>(body: F) -> (JoinHandle<Result<()>>, oneshot::Receiver<()>)
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let (done_tx, done_rx) = oneshot::channel();
    let handle = std::thread::spawn(move || {
        let result = body();
        let _ = done_tx.send(());
        result
    });
    (handle, done_rx)
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let counter = PerCpuCounter::open(&args.pinned_file)
        .with_context(|| format!("failed to open counter map {}", args.pinned_file.display()))?;

    if !quiet {
        eprintln!("ip-hist v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("map: {}", args.pinned_file.display());
        eprintln!("cpus: {}", counter.cpus());
        eprintln!("refresh: {}ms", args.refresh);
    }

    let (poller, mut stream) = Poller::start(counter, args.refresh_interval())?;

    // Launch the dashboard in its own thread unless headless
    let (tui_handle, snapshot_tx, dashboard_done) = if args.headless {
        (None, None, None)
    } else {
        let (snapshot_tx, snapshot_rx) = bounded(DASHBOARD_BACKLOG);
        let source = args.pinned_file.display().to_string();
        let max_series = args.max_series;
        let (handle, done) =
            spawn_with_exit_signal(move || tui::run_dashboard(snapshot_rx, source, max_series));
        (Some(handle), Some(snapshot_tx), Some(done))
    };

    let dashboard_exit = async move {
        match dashboard_done {
            Some(done) => {
                let _ = done.await;
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(dashboard_exit);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let duration_limit = args.duration_limit();
    let deadline = async move {
        match duration_limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let started = Instant::now();
    let mut ticks: u64 = 0;
    let stdout = io::stdout();

    let exit_reason = loop {
        tokio::select! {
            _ = &mut ctrl_c => break "interrupted",
            () = &mut deadline => break "duration limit reached",
            () = &mut dashboard_exit => break "dashboard closed",
            snapshot = stream.recv() => {
                let Some(snapshot) = snapshot else { break "poller stopped" };
                ticks += 1;
                match &snapshot_tx {
                    Some(tx) => {
                        if forward(tx, snapshot) == Forward::Closed {
                            break "dashboard closed";
                        }
                    }
                    None => write_json_line(&mut stdout.lock(), ticks, &snapshot)?,
                }
            }
        }
    };

    // Closing the channel ends the dashboard loop and restores the terminal
    drop(snapshot_tx);
    let reason = poller.stop().await;
    info!("poller finished: {reason}");

    if let Some(handle) = tui_handle {
        match handle.join() {
            Ok(result) => result.context("dashboard failed")?,
            Err(_) => anyhow::bail!("dashboard thread panicked"),
        }
    }

    if !quiet || args.headless {
        eprintln!(
            "\n{exit_reason}: {:.1}s, {ticks} snapshots, poller {reason}",
            started.elapsed().as_secs_f64()
        );
    }

    match reason {
        StopReason::LookupFailed(err) => {
            Err(anyhow::Error::new(err).context("counter map became unreadable"))
        }
        StopReason::Cancelled | StopReason::ConsumerGone => Ok(()),
    }
}
