//! Typed access to the `bpf(2)` syscall
//!
//! - `command`: command codes and flag values from `linux/bpf.h`
//! - `attr`: fixed-layout attribute records, one per `union bpf_attr` arm
//! - `sys`: the syscall seam and [`invoke`]

pub mod attr;
pub mod command;
pub mod sys;

#[cfg(test)]
pub(crate) mod fake;

pub use attr::{Attribute, InfoAttr, MapElemAttr, MapInfo, ObjectAttr};
pub use command::{
    is_per_cpu_map, Command, BPF_ANY, BPF_EXIST, BPF_F_RDONLY, BPF_F_WRONLY, BPF_NOEXIST,
};
pub use sys::{invoke, Kernel, Syscall};
