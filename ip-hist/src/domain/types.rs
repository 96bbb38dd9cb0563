//! Domain types providing compile-time safety and self-documentation

use std::fmt;
use std::io;

/// CPU ID
///
/// Represents a CPU core ID (0, 1, 2, ...). Per-CPU map values are indexed by
/// this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpuId(pub u32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU#{}", self.0)
    }
}

/// OS error code reported by the kernel
///
/// Wraps the raw `errno` so errors can name the condition (`ENOENT`) and not
/// just print a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Errno(pub i32);

/// Kernel-internal "not supported" code that leaks out of some bpf commands.
/// It has no libc constant.
const ENOTSUPP: i32 = 524;

impl Errno {
    /// Take the raw code out of an `io::Error`, 0 if it carries none
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        Self(err.raw_os_error().unwrap_or(0))
    }

    /// Symbolic name of the error code, e.g. `"ENOENT"`
    #[must_use]
    pub fn name(self) -> &'static str {
        match self.0 {
            libc::EPERM => "EPERM",
            libc::ENOENT => "ENOENT",
            libc::ESRCH => "ESRCH",
            libc::EINTR => "EINTR",
            libc::EIO => "EIO",
            libc::ENXIO => "ENXIO",
            libc::E2BIG => "E2BIG",
            libc::EBADF => "EBADF",
            libc::EAGAIN => "EAGAIN",
            libc::ENOMEM => "ENOMEM",
            libc::EACCES => "EACCES",
            libc::EFAULT => "EFAULT",
            libc::EBUSY => "EBUSY",
            libc::EEXIST => "EEXIST",
            libc::ENODEV => "ENODEV",
            libc::ENOTDIR => "ENOTDIR",
            libc::EINVAL => "EINVAL",
            libc::ENFILE => "ENFILE",
            libc::EMFILE => "EMFILE",
            libc::ENOSPC => "ENOSPC",
            libc::ERANGE => "ERANGE",
            libc::ENAMETOOLONG => "ENAMETOOLONG",
            libc::ENOSYS => "ENOSYS",
            libc::ELOOP => "ELOOP",
            libc::EOPNOTSUPP => "EOPNOTSUPP",
            ENOTSUPP => "ENOTSUPP",
            _ => "EUNKNOWN",
        }
    }

    /// True for the codes the kernel uses to refuse an unprivileged caller
    #[must_use]
    pub fn is_permission_denied(self) -> bool {
        self.0 == libc::EPERM || self.0 == libc::EACCES
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), io::Error::from_raw_os_error(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_names() {
        assert_eq!(Errno(libc::ENOENT).name(), "ENOENT");
        assert_eq!(Errno(libc::EBADF).name(), "EBADF");
        assert_eq!(Errno(libc::ENOSPC).name(), "ENOSPC");
        assert_eq!(Errno(524).name(), "ENOTSUPP");
        assert_eq!(Errno(100_000).name(), "EUNKNOWN");
    }

    #[test]
    fn test_errno_display_includes_description() {
        let text = Errno(libc::ENOENT).to_string();
        assert!(text.starts_with("ENOENT: "));
        assert!(text.contains("No such file or directory"));
    }

    #[test]
    fn test_errno_from_io() {
        let err = io::Error::from_raw_os_error(libc::EPERM);
        let errno = Errno::from_io(&err);
        assert_eq!(errno, Errno(libc::EPERM));
        assert!(errno.is_permission_denied());
        assert!(!Errno(libc::ENOENT).is_permission_denied());
    }

    #[test]
    fn test_cpu_id_display() {
        assert_eq!(CpuId(3).to_string(), "CPU#3");
    }
}
