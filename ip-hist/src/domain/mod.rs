//! Domain model for ip-hist
//!
//! Core domain types and errors shared by the syscall layer, the map client
//! and the poller.

pub mod errors;
pub mod types;

pub use types::{CpuId, Errno};

pub use errors::{BpfError, Field, MapError, PollerError, SyscallError, ValidationError};
