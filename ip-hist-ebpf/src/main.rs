//! # eBPF Kernel-Side Packet Counter
//!
//! XDP program that counts every packet seen on the attached interface.
//!
//! ## Maps (Shared with Userspace)
//!
//! - `packet_count` - per-CPU array with one `u64` slot per CPU
//!
//! The program never drops traffic. Loading, attaching and pinning are done by
//! external tooling (`ip link set dev <if> xdp obj ...` or an aya loader); the
//! userspace side only reads the pinned map.
//!
//! ## Build
//!
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::PerCpuArray,
    programs::XdpContext,
};
use ip_hist_common::{COUNTER_KEY, MAX_ENTRIES};

/// Per-CPU packet counter
///
/// - **Key**: always `COUNTER_KEY`
/// - **Value**: packets seen by this CPU
///
/// Each CPU owns its slot, so increments need no atomics.
#[map(name = "packet_count")]
static PACKET_COUNT: PerCpuArray<u64> = PerCpuArray::pinned(MAX_ENTRIES, 0);

#[xdp]
pub fn xdp_packet_count(_ctx: XdpContext) -> u32 {
    if let Some(count) = PACKET_COUNT.get_ptr_mut(COUNTER_KEY) {
        // SAFETY: the pointer comes from the map lookup and this CPU is the only writer.
        unsafe { *count += 1 };
    }
    xdp_action::XDP_PASS
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 4] = *b"GPL\0";

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
