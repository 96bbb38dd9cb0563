//! In-memory stand-in for the kernel side of `bpf(2)`, used by unit tests.
//!
//! Emulates one pinned per-CPU array map with a single `u32` key. Each lookup
//! serves the next queued set of per-CPU values and keeps serving the last one
//! once the queue is empty.

#![allow(unsafe_code)]

use std::collections::VecDeque;
use std::ffi::{c_void, CStr, OsStr};
use std::io;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::attr::{MapInfo, RawInfoAttr, RawMapElemAttr, RawObjectAttr};
use super::command::{Command, BPF_MAP_TYPE_PERCPU_ARRAY};
use super::sys::Syscall;

#[derive(Debug)]
struct State {
    pin: PathBuf,
    info: MapInfo,
    cpus: usize,
    queued: VecDeque<Vec<u64>>,
    current: Vec<u64>,
    successful_lookups: usize,
    fail_after: Option<usize>,
    calls: Vec<Command>,
    closed: Vec<RawFd>,
    pinned: Vec<PathBuf>,
    updates: Vec<(Vec<u8>, Vec<u8>, u64)>,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeKernel {
    state: Arc<Mutex<State>>,
}

fn errno(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

impl FakeKernel {
    /// Descriptor handed out for the pinned map
    pub(crate) const FD: RawFd = 7;

    pub(crate) fn new(pin: impl AsRef<Path>, cpus: usize) -> Self {
        let mut info = MapInfo {
            map_type: BPF_MAP_TYPE_PERCPU_ARRAY,
            id: 42,
            key_size: 4,
            value_size: 8,
            max_entries: 1,
            ..MapInfo::default()
        };
        info.name[..12].copy_from_slice(b"packet_count");
        Self {
            state: Arc::new(Mutex::new(State {
                pin: pin.as_ref().to_path_buf(),
                info,
                cpus,
                queued: VecDeque::new(),
                current: vec![0; cpus],
                successful_lookups: 0,
                fail_after: None,
                calls: Vec::new(),
                closed: Vec::new(),
                pinned: Vec::new(),
                updates: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Queue per-CPU values for upcoming lookups
    pub(crate) fn with_values(self, values: &[&[u64]]) -> Self {
        {
            let mut state = self.state();
            for v in values {
                assert_eq!(v.len(), state.cpus);
                state.queued.push_back(v.to_vec());
            }
        }
        self
    }

    /// Lookups fail with ENOENT once `n` of them succeeded
    pub(crate) fn fail_after(self, n: usize) -> Self {
        self.state().fail_after = Some(n);
        self
    }

    pub(crate) fn with_info(self, info: MapInfo) -> Self {
        self.state().info = info;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub(crate) fn calls(&self) -> Vec<Command> {
        self.state().calls.clone()
    }

    pub(crate) fn closed(&self) -> Vec<RawFd> {
        self.state().closed.clone()
    }

    pub(crate) fn pinned(&self) -> Vec<PathBuf> {
        self.state().pinned.clone()
    }

    pub(crate) fn updates(&self) -> Vec<(Vec<u8>, Vec<u8>, u64)> {
        self.state().updates.clone()
    }
}

fn check_fd(fd: u32) -> io::Result<()> {
    if i64::from(fd) == i64::from(FakeKernel::FD) {
        Ok(())
    } else {
        Err(errno(libc::EBADF))
    }
}

impl Syscall for FakeKernel {
    unsafe fn bpf(&self, command: Command, attr: *mut c_void, size: u32) -> io::Result<i64> {
        let mut state = self.state();
        state.calls.push(command);

        match command {
            Command::ObjGet | Command::ObjPin => {
                assert_eq!(size as usize, std::mem::size_of::<RawObjectAttr>());
                // SAFETY: invoke hands over a live RawObjectAttr of the asserted size.
                let raw = unsafe { *attr.cast::<RawObjectAttr>() };
                // SAFETY: pathname points at the NUL-terminated CString owned by the attribute.
                let path = unsafe { CStr::from_ptr(raw.pathname as usize as *const libc::c_char) };
                let path = PathBuf::from(OsStr::from_bytes(path.to_bytes()));
                if command == Command::ObjPin {
                    check_fd(raw.bpf_fd)?;
                    state.pinned.push(path);
                    return Ok(0);
                }
                if path == state.pin {
                    Ok(i64::from(FakeKernel::FD))
                } else {
                    Err(errno(libc::ENOENT))
                }
            }
            Command::ObjGetInfoByFd => {
                assert_eq!(size as usize, std::mem::size_of::<RawInfoAttr>());
                // SAFETY: invoke hands over a live, exclusively borrowed RawInfoAttr.
                let raw = unsafe { &mut *attr.cast::<RawInfoAttr>() };
                check_fd(raw.bpf_fd)?;
                let len = (raw.info_len as usize).min(std::mem::size_of::<MapInfo>());
                let info = state.info;
                // SAFETY: raw.info points at a MapInfo of at least info_len bytes and
                // len never exceeds size_of::<MapInfo>().
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        std::ptr::addr_of!(info).cast::<u8>(),
                        raw.info as usize as *mut u8,
                        len,
                    );
                }
                raw.info_len = u32::try_from(len).unwrap();
                Ok(0)
            }
            Command::MapLookupElem => {
                assert_eq!(size as usize, std::mem::size_of::<RawMapElemAttr>());
                // SAFETY: invoke hands over a live RawMapElemAttr of the asserted size.
                let raw = unsafe { *attr.cast::<RawMapElemAttr>() };
                check_fd(raw.map_fd)?;
                // SAFETY: validation guarantees a non-empty key; counter keys are 4 bytes.
                let key = unsafe { std::ptr::read_unaligned(raw.key as usize as *const u32) };
                if key != 0 {
                    return Err(errno(libc::ENOENT));
                }
                if state.fail_after.is_some_and(|n| state.successful_lookups >= n) {
                    return Err(errno(libc::ENOENT));
                }
                if let Some(next) = state.queued.pop_front() {
                    state.current = next;
                }
                let bytes: Vec<u8> = state.current.iter().flat_map(|v| v.to_ne_bytes()).collect();
                // SAFETY: the caller's value buffer is sized for cpus * 8 bytes, the same
                // length as `bytes`.
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        bytes.as_ptr(),
                        raw.value as usize as *mut u8,
                        bytes.len(),
                    );
                }
                state.successful_lookups += 1;
                Ok(0)
            }
            Command::MapUpdateElem => {
                // SAFETY: invoke hands over a live RawMapElemAttr.
                let raw = unsafe { *attr.cast::<RawMapElemAttr>() };
                check_fd(raw.map_fd)?;
                let value_len = state.cpus * 8;
                // SAFETY: key borrows the caller's 4-byte counter key.
                let key =
                    unsafe { std::slice::from_raw_parts(raw.key as usize as *const u8, 4) }.to_vec();
                // SAFETY: value borrows the caller's buffer of cpus * 8 bytes.
                let value = unsafe {
                    std::slice::from_raw_parts(raw.value as usize as *const u8, value_len)
                }
                .to_vec();
                state.updates.push((key, value, raw.flags));
                Ok(0)
            }
            _ => Err(errno(libc::EINVAL)),
        }
    }

    fn close(&self, fd: RawFd) {
        self.state().closed.push(fd);
    }
}
