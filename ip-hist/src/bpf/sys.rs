//! # Syscall Invoker
//!
//! [`invoke`] is the only place that hands an attribute to the kernel. The
//! [`Syscall`] trait is the seam between it and the raw `bpf(2)` call, so the
//! layers above can be driven by a fake kernel in tests.

#![allow(unsafe_code)] // raw syscall and descriptor ownership

use log::trace;
use std::ffi::c_void;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};

use super::attr::Attribute;
use super::command::Command;
use crate::domain::{BpfError, Errno, SyscallError};

/// Backend that executes `bpf(2)` commands
pub trait Syscall: Send + Sync {
    /// Issue `bpf(command, attr, size)`.
    ///
    /// Returns the non-negative result, or the OS error when the kernel
    /// returns a negative value.
    ///
    /// # Safety
    /// `attr` must point to `size` bytes laid out as the `union bpf_attr` arm
    /// for `command`, and every address stored in that record must stay valid
    /// (and unmoved) until the call returns.
    unsafe fn bpf(&self, command: Command, attr: *mut c_void, size: u32) -> io::Result<i64>;

    /// Release a descriptor previously returned by [`Syscall::bpf`]
    fn close(&self, fd: RawFd);
}

/// The running kernel
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

impl Syscall for Kernel {
    unsafe fn bpf(&self, command: Command, attr: *mut c_void, size: u32) -> io::Result<i64> {
        // SAFETY: forwarded from the caller's contract.
        let ret = unsafe { libc::syscall(libc::SYS_bpf, command.as_raw(), attr, size) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(i64::from(ret))
    }

    fn close(&self, fd: RawFd) {
        // SAFETY: only called by the owner of a descriptor returned from bpf(2), exactly once.
        drop(unsafe { OwnedFd::from_raw_fd(fd) });
    }
}

/// Run one `bpf(2)` command.
///
/// The attribute is validated first; a [`crate::domain::ValidationError`] is
/// returned without calling the backend. On success the raw result is
/// returned: a new descriptor for `BPF_OBJ_GET`, zero for element commands
/// (the payload lands in buffers the attribute borrows).
///
/// # Errors
/// - [`BpfError::Validation`] if the attribute is missing an input
/// - [`BpfError::Syscall`] if the kernel rejected the command
pub fn invoke<S, A>(sys: &S, command: Command, attr: &mut A) -> Result<i64, BpfError>
where
    S: Syscall + ?Sized,
    A: Attribute + ?Sized,
{
    let addr = attr.address()?;
    let size = attr.size();

    // SAFETY: `addr` points into `attr`, which stays mutably borrowed for the
    // whole call. Every address inside the record refers to data the attribute
    // owns or borrows for at least as long as itself.
    let ret = unsafe { sys.bpf(command, addr, size) }
        .map_err(|err| SyscallError { command, errno: Errno::from_io(&err) })?;

    trace!("{command} -> {ret}");
    Ok(ret)
}
