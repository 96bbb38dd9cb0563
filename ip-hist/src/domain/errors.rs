//! Structured error types for ip-hist
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! The layers stack the same way the code does:
//! - [`ValidationError`] - an attribute was missing an input, the kernel was never called
//! - [`SyscallError`] - the kernel rejected the command
//! - [`BpfError`] - either of the above, as returned by [`crate::bpf::invoke`]
//! - [`MapError`] - a [`BpfError`] plus the path or descriptor it happened on

use std::fmt;
use std::os::fd::RawFd;
use std::path::PathBuf;
use thiserror::Error;

use super::types::Errno;
use crate::bpf::Command;

/// Input an attribute needs before it can be handed to the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Descriptor,
    Key,
    Value,
    Path,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Descriptor => "file descriptor",
            Field::Key => "key",
            Field::Value => "value",
            Field::Path => "path",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {0}")]
    MissingField(Field),

    #[error("invalid path {}: contains a NUL byte", .0.display())]
    InvalidPath(PathBuf),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{command} failed: {errno}")]
pub struct SyscallError {
    pub command: Command,
    pub errno: Errno,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BpfError {
    #[error("invalid syscall attributes: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Syscall(#[from] SyscallError),
}

impl BpfError {
    /// OS error code, if the kernel was reached
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            BpfError::Syscall(err) => Some(err.errno),
            BpfError::Validation(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum MapError {
    #[error("failed to open pinned map {}: {source}", .path.display())]
    Open { path: PathBuf, source: BpfError },

    #[error("kernel returned unusable descriptor {fd} for {}", .path.display())]
    InvalidDescriptor { path: PathBuf, fd: i64 },

    #[error("lookup on map fd {fd} failed: {source}")]
    Lookup { fd: RawFd, source: BpfError },

    #[error("update on map fd {fd} failed: {source}")]
    Update { fd: RawFd, source: BpfError },

    #[error("failed to pin map fd {fd} at {}: {source}", .path.display())]
    Pin { fd: RawFd, path: PathBuf, source: BpfError },

    #[error("failed to query info for map fd {fd}: {source}")]
    Info { fd: RawFd, source: BpfError },

    #[error("map at {} is not a per-CPU u64 counter: {reason}", .path.display())]
    Precondition { path: PathBuf, reason: String },

    #[error("failed to read CPU topology: {0}")]
    CpuTopology(String),
}

impl MapError {
    /// OS error code behind this error, if the kernel was reached
    #[must_use]
    pub fn errno(&self) -> Option<Errno> {
        match self {
            MapError::Open { source, .. }
            | MapError::Lookup { source, .. }
            | MapError::Update { source, .. }
            | MapError::Pin { source, .. }
            | MapError::Info { source, .. } => source.errno(),
            MapError::InvalidDescriptor { .. }
            | MapError::Precondition { .. }
            | MapError::CpuTopology(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerError {
    #[error("polling interval must be greater than zero")]
    ZeroInterval,
}
