//! Pinned map access and periodic polling
//!
//! - `map`: open a pinned map and run element commands on it
//! - `percpu`: read a per-CPU `u64` counter into [`Snapshot`]s
//! - `poller`: time-driven, cancellable stream of snapshots

pub mod map;
pub mod percpu;
pub mod poller;

pub use map::MapClient;
pub use percpu::{PerCpuCounter, Snapshot};
pub use poller::{Poller, SnapshotStream, StopReason};
