//! # Shared Map Schema (eBPF ↔ Userspace)
//!
//! Constants describing the per-CPU packet counter map. The XDP program in
//! `ip-hist-ebpf` defines the map from these values and the userspace poller
//! checks the pinned map against them before reading it.
//!
//! ## Layout
//!
//! ```text
//! BPF_MAP_TYPE_PERCPU_ARRAY "packet_count"
//!   key:   u32 (always COUNTER_KEY)
//!   value: u64 per possible CPU
//!   max_entries: 1
//! ```

#![no_std]

/// Name of the counter map inside the eBPF object
pub const PACKET_COUNT_MAP: &str = "packet_count";

/// Where `tc` pins global maps when the object is loaded with iproute2
pub const DEFAULT_PIN_PATH: &str = "/sys/fs/bpf/tc/globals/packet_count";

/// The map holds a single array-wide counter, so the key is always zero.
pub const COUNTER_KEY: u32 = 0;

/// Number of array slots
pub const MAX_ENTRIES: u32 = 1;

/// Key size in bytes (`u32`)
pub const KEY_SIZE: usize = core::mem::size_of::<u32>();

/// Value size in bytes for one CPU slot (`u64`)
pub const VALUE_SIZE: usize = core::mem::size_of::<u64>();
