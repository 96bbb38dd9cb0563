//! # Syscall Attribute Variants
//!
//! The kernel takes a single `union bpf_attr` for every command and reads the
//! arm that matches the command code. Each type here is one arm:
//!
//! | Type            | Commands                                | Size |
//! |-----------------|-----------------------------------------|------|
//! | [`ObjectAttr`]  | `BPF_OBJ_GET`, `BPF_OBJ_PIN`            | 16   |
//! | [`MapElemAttr`] | `BPF_MAP_LOOKUP_ELEM`, `BPF_MAP_UPDATE_ELEM` | 32 |
//! | [`InfoAttr`]    | `BPF_OBJ_GET_INFO_BY_FD`                | 16   |
//!
//! Each variant keeps its inputs (path bytes, key, value, info buffer) owned or
//! borrowed for as long as it lives, and only writes their addresses into the
//! raw record inside [`Attribute::address`], after checking that every required
//! input is present. Passing `&mut attr` to [`crate::bpf::invoke`] keeps the
//! inputs alive and unmoved for the whole syscall.

use std::ffi::{c_void, CString};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::domain::{Field, ValidationError};

/// One arm of `union bpf_attr`
pub trait Attribute {
    /// Validate the inputs and return the address of the raw record.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when a required input is missing; the
    /// record is not handed out in that case.
    fn address(&mut self) -> Result<*mut c_void, ValidationError>;

    /// Size in bytes of the raw record
    fn size(&self) -> u32;
}

fn ptr_to_u64<T>(ptr: *const T) -> u64 {
    ptr as usize as u64
}

fn record_size<T>() -> u32 {
    // Every arm is a few dozen bytes.
    #[allow(clippy::cast_possible_truncation)]
    let size = std::mem::size_of::<T>() as u32;
    size
}

// ============================================================================
// BPF_OBJ_* arm
// ============================================================================

/// ```c
/// struct { /* BPF_OBJ_* commands */
///     __aligned_u64 pathname;
///     __u32         bpf_fd;
///     __u32         file_flags;
/// };
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawObjectAttr {
    pub pathname: u64,
    pub bpf_fd: u32,
    pub file_flags: u32,
}

#[derive(Debug)]
enum PathArg {
    Missing,
    Invalid(PathBuf),
    Valid(CString),
}

impl PathArg {
    fn new(path: &Path) -> Self {
        let bytes = path.as_os_str().as_bytes();
        if bytes.is_empty() {
            return PathArg::Missing;
        }
        match CString::new(bytes) {
            Ok(path) => PathArg::Valid(path),
            Err(_) => PathArg::Invalid(path.to_path_buf()),
        }
    }
}

/// Attribute for `BPF_OBJ_GET` (open a pinned object) and `BPF_OBJ_PIN`
#[derive(Debug)]
pub struct ObjectAttr {
    path: PathArg,
    fd: Option<RawFd>,
    file_flags: u32,
    raw: RawObjectAttr,
}

impl ObjectAttr {
    /// Open the object pinned at `path`. `file_flags` is 0 or one of
    /// `BPF_F_RDONLY` / `BPF_F_WRONLY`.
    pub fn get(path: impl AsRef<Path>, file_flags: u32) -> Self {
        Self {
            path: PathArg::new(path.as_ref()),
            fd: None,
            file_flags,
            raw: RawObjectAttr::default(),
        }
    }

    /// Pin the object behind `fd` at `path`
    pub fn pin(fd: RawFd, path: impl AsRef<Path>) -> Self {
        Self {
            path: PathArg::new(path.as_ref()),
            fd: Some(fd),
            file_flags: 0,
            raw: RawObjectAttr::default(),
        }
    }
}

impl Attribute for ObjectAttr {
    fn address(&mut self) -> Result<*mut c_void, ValidationError> {
        let path = match &self.path {
            PathArg::Valid(path) => path,
            PathArg::Missing => return Err(ValidationError::MissingField(Field::Path)),
            PathArg::Invalid(path) => return Err(ValidationError::InvalidPath(path.clone())),
        };
        let bpf_fd = match self.fd {
            None => 0,
            Some(fd) => valid_fd(fd)?,
        };
        self.raw = RawObjectAttr {
            pathname: ptr_to_u64(path.as_ptr()),
            bpf_fd,
            file_flags: self.file_flags,
        };
        Ok(ptr::addr_of_mut!(self.raw).cast())
    }

    fn size(&self) -> u32 {
        record_size::<RawObjectAttr>()
    }
}

fn valid_fd(fd: RawFd) -> Result<u32, ValidationError> {
    u32::try_from(fd)
        .ok()
        .filter(|fd| *fd > 0)
        .ok_or(ValidationError::MissingField(Field::Descriptor))
}

// ============================================================================
// BPF_MAP_*_ELEM arm
// ============================================================================

/// ```c
/// struct { /* BPF_MAP_*_ELEM commands */
///     __u32         map_fd;
///     __aligned_u64 key;
///     union {
///         __aligned_u64 value;
///         __aligned_u64 next_key;
///     };
///     __u64         flags;
/// };
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawMapElemAttr {
    pub map_fd: u32,
    pub pad0: u32,
    pub key: u64,
    /// `value` or `next_key`
    pub value: u64,
    pub flags: u64,
}

#[derive(Debug)]
enum ElemValue<'a> {
    /// Kernel writes into it (lookup)
    Out(&'a mut [u8]),
    /// Kernel reads from it (update)
    In(&'a [u8]),
}

/// Attribute for the element commands on an open map
///
/// ```ignore
/// let mut attr = MapElemAttr::new(fd).key(&key).value_out(&mut buf);
/// invoke(&Kernel, Command::MapLookupElem, &mut attr)?;
/// ```
///
/// The value buffer must be exactly as large as the kernel's value for this
/// map (`value_size`, times the possible CPU count for per-CPU maps). The
/// kernel does not know the buffer length and will write past a short one.
#[derive(Debug)]
pub struct MapElemAttr<'a> {
    fd: RawFd,
    key: Option<&'a [u8]>,
    value: Option<ElemValue<'a>>,
    flags: u64,
    raw: RawMapElemAttr,
}

impl<'a> MapElemAttr<'a> {
    #[must_use]
    pub fn new(fd: RawFd) -> Self {
        Self { fd, key: None, value: None, flags: 0, raw: RawMapElemAttr::default() }
    }

    #[must_use]
    pub fn key(mut self, key: &'a [u8]) -> Self {
        self.key = Some(key);
        self
    }

    /// Buffer the kernel fills on lookup
    #[must_use]
    pub fn value_out(mut self, value: &'a mut [u8]) -> Self {
        self.value = Some(ElemValue::Out(value));
        self
    }

    /// Buffer the kernel copies from on update
    #[must_use]
    pub fn value_in(mut self, value: &'a [u8]) -> Self {
        self.value = Some(ElemValue::In(value));
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }
}

impl Attribute for MapElemAttr<'_> {
    fn address(&mut self) -> Result<*mut c_void, ValidationError> {
        let map_fd = valid_fd(self.fd)?;
        let key = match self.key {
            Some(key) if !key.is_empty() => ptr_to_u64(key.as_ptr()),
            _ => return Err(ValidationError::MissingField(Field::Key)),
        };
        let value = match &mut self.value {
            Some(ElemValue::Out(value)) if !value.is_empty() => ptr_to_u64(value.as_mut_ptr()),
            Some(ElemValue::In(value)) if !value.is_empty() => ptr_to_u64(value.as_ptr()),
            _ => return Err(ValidationError::MissingField(Field::Value)),
        };
        self.raw = RawMapElemAttr { map_fd, pad0: 0, key, value, flags: self.flags };
        Ok(ptr::addr_of_mut!(self.raw).cast())
    }

    fn size(&self) -> u32 {
        record_size::<RawMapElemAttr>()
    }
}

// ============================================================================
// BPF_OBJ_GET_INFO_BY_FD arm
// ============================================================================

/// ```c
/// struct { /* BPF_OBJ_GET_INFO_BY_FD */
///     __u32         bpf_fd;
///     __u32         info_len;
///     __aligned_u64 info;
/// } info;
/// ```
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawInfoAttr {
    pub bpf_fd: u32,
    pub info_len: u32,
    pub info: u64,
}

/// Leading fields of `struct bpf_map_info`
///
/// The kernel copies `min(info_len, sizeof(struct bpf_map_info))` bytes, so a
/// prefix of the struct is a valid request on every kernel version.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapInfo {
    pub map_type: u32,
    pub id: u32,
    pub key_size: u32,
    pub value_size: u32,
    pub max_entries: u32,
    pub map_flags: u32,
    pub name: [u8; 16],
}

impl MapInfo {
    /// Map name up to the first NUL
    #[must_use]
    pub fn name(&self) -> String {
        let len = self.name.iter().position(|b| *b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

/// Attribute for `BPF_OBJ_GET_INFO_BY_FD` on a map descriptor
#[derive(Debug)]
pub struct InfoAttr<'a> {
    fd: RawFd,
    info: &'a mut MapInfo,
    raw: RawInfoAttr,
}

impl<'a> InfoAttr<'a> {
    pub fn new(fd: RawFd, info: &'a mut MapInfo) -> Self {
        Self { fd, info, raw: RawInfoAttr::default() }
    }

    /// Bytes the kernel reported as filled in
    #[must_use]
    pub fn info_len(&self) -> u32 {
        self.raw.info_len
    }
}

impl Attribute for InfoAttr<'_> {
    fn address(&mut self) -> Result<*mut c_void, ValidationError> {
        let bpf_fd = valid_fd(self.fd)?;
        self.raw = RawInfoAttr {
            bpf_fd,
            info_len: record_size::<MapInfo>(),
            info: ptr_to_u64(ptr::addr_of_mut!(*self.info)),
        };
        Ok(ptr::addr_of_mut!(self.raw).cast())
    }

    fn size(&self) -> u32 {
        record_size::<RawInfoAttr>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_object_attr_layout() {
        assert_eq!(size_of::<RawObjectAttr>(), 16);
        assert_eq!(offset_of!(RawObjectAttr, pathname), 0);
        assert_eq!(offset_of!(RawObjectAttr, bpf_fd), 8);
        assert_eq!(offset_of!(RawObjectAttr, file_flags), 12);
    }

    #[test]
    fn test_map_elem_attr_layout() {
        assert_eq!(size_of::<RawMapElemAttr>(), 32);
        assert_eq!(offset_of!(RawMapElemAttr, map_fd), 0);
        assert_eq!(offset_of!(RawMapElemAttr, key), 8);
        assert_eq!(offset_of!(RawMapElemAttr, value), 16);
        assert_eq!(offset_of!(RawMapElemAttr, flags), 24);
    }

    #[test]
    fn test_info_attr_layout() {
        assert_eq!(size_of::<RawInfoAttr>(), 16);
        assert_eq!(offset_of!(RawInfoAttr, info_len), 4);
        assert_eq!(offset_of!(RawInfoAttr, info), 8);
        assert_eq!(size_of::<MapInfo>(), 40);
        assert_eq!(offset_of!(MapInfo, value_size), 12);
        assert_eq!(offset_of!(MapInfo, name), 24);
    }

    #[test]
    fn test_object_get_points_at_path() {
        let mut attr = ObjectAttr::get("/sys/fs/bpf/counter", 0);
        let addr = attr.address().expect("valid attribute");
        assert_eq!(attr.size(), 16);

        // SAFETY: addr points at attr.raw, which is alive and not otherwise borrowed.
        #[allow(unsafe_code)]
        let raw = unsafe { *addr.cast::<RawObjectAttr>() };
        assert_eq!(raw.bpf_fd, 0);
        assert_eq!(raw.file_flags, 0);

        // SAFETY: pathname was taken from the CString owned by attr.
        #[allow(unsafe_code)]
        let path = unsafe { std::ffi::CStr::from_ptr(raw.pathname as usize as *const _) };
        assert_eq!(path.to_bytes(), b"/sys/fs/bpf/counter");
    }

    #[test]
    fn test_object_get_requires_path() {
        let mut attr = ObjectAttr::get("", 0);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Path)));
    }

    #[test]
    fn test_object_get_rejects_nul_in_path() {
        let mut attr = ObjectAttr::get("/sys/fs/bpf/a\0b", 0);
        assert!(matches!(attr.address(), Err(ValidationError::InvalidPath(_))));
    }

    #[test]
    fn test_object_pin_requires_descriptor() {
        let mut attr = ObjectAttr::pin(0, "/sys/fs/bpf/counter");
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Descriptor)));

        let mut attr = ObjectAttr::pin(-1, "/sys/fs/bpf/counter");
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Descriptor)));

        let mut attr = ObjectAttr::pin(5, "/sys/fs/bpf/counter");
        assert!(attr.address().is_ok());
        assert_eq!(attr.raw.bpf_fd, 5);
    }

    #[test]
    fn test_map_elem_missing_fields() {
        let key = 0u32.to_ne_bytes();
        let mut value = [0u8; 8];

        let mut attr = MapElemAttr::new(0).key(&key).value_out(&mut value);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Descriptor)));

        let mut value = [0u8; 8];
        let mut attr = MapElemAttr::new(3).value_out(&mut value);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Key)));

        let mut attr = MapElemAttr::new(3).key(&key);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Value)));

        let mut empty: [u8; 0] = [];
        let mut attr = MapElemAttr::new(3).key(&key).value_out(&mut empty);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Value)));
    }

    #[test]
    fn test_map_elem_fills_raw_record() {
        let key = 0u32.to_ne_bytes();
        let mut value = [0u8; 32];
        let value_addr = ptr_to_u64(value.as_ptr());

        let mut attr = MapElemAttr::new(9).key(&key).value_out(&mut value).flags(2);
        assert!(attr.address().is_ok());
        assert_eq!(attr.size(), 32);
        assert_eq!(attr.raw.map_fd, 9);
        assert_eq!(attr.raw.pad0, 0);
        assert_eq!(attr.raw.key, ptr_to_u64(key.as_ptr()));
        assert_eq!(attr.raw.value, value_addr);
        assert_eq!(attr.raw.flags, 2);
    }

    #[test]
    fn test_info_attr_requests_map_info_prefix() {
        let mut info = MapInfo::default();
        let info_addr = ptr_to_u64(ptr::addr_of!(info));
        let mut attr = InfoAttr::new(4, &mut info);
        assert!(attr.address().is_ok());
        assert_eq!(attr.raw.bpf_fd, 4);
        assert_eq!(attr.info_len(), 40);
        assert_eq!(attr.raw.info, info_addr);

        let mut info = MapInfo::default();
        let mut attr = InfoAttr::new(-3, &mut info);
        assert_eq!(attr.address(), Err(ValidationError::MissingField(Field::Descriptor)));
    }

    #[test]
    fn test_map_info_name() {
        let mut info = MapInfo::default();
        info.name[..12].copy_from_slice(b"packet_count");
        assert_eq!(info.name(), "packet_count");
    }
}
