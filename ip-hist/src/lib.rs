//! # ip-hist - Per-CPU Packet Counter Viewer
//!
//! ip-hist reads a per-CPU packet counter that an XDP program keeps in a
//! pinned eBPF map and turns it into a live per-CPU chart. It talks to the
//! kernel through the raw `bpf(2)` system call; loading and pinning the
//! program is left to external tooling (`ip link`, `bpftool`, ...).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 XDP program (ip-hist-ebpf)                      │
//! │        PerCpuArray<u64> "packet_count", slot 0 += 1             │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ pinned at /sys/fs/bpf/tc/globals/...
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ip-hist (This Crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │     bpf      │──▶│   counter    │──▶│     tui      │         │
//! │  │  (syscall)   │   │ (map/poller) │   │  (terminal)  │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`bpf`]: command numbers, kernel attribute records and the syscall invoker
//! - [`counter`]: map client, per-CPU counter reads and the periodic poller
//! - [`cpu`]: possible CPU count from sysfs
//! - [`tui`]: terminal chart fed by the poller
//! - [`cli`]: command-line arguments
//! - [`domain`]: shared types and error enums
//!
//! ## Typical Usage
//!
//! ```bash
//! # Chart the default pinned counter
//! sudo ./ip-hist
//!
//! # Print JSON lines instead of drawing
//! sudo ./ip-hist --headless --pinned-file /sys/fs/bpf/my_counter
//! ```

pub mod bpf;
pub mod cli;
pub mod counter;
pub mod cpu;
pub mod domain;
pub mod tui;
