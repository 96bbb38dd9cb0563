//! # Map Client
//!
//! Opens a pinned map by path and runs element commands against the
//! resulting descriptor. The descriptor is owned by the client and released
//! through the backend when the client is dropped.

use log::debug;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use crate::bpf::{invoke, Command, InfoAttr, Kernel, MapElemAttr, MapInfo, ObjectAttr, Syscall};
use crate::domain::MapError;

/// Open handle on a pinned BPF map
#[derive(Debug)]
pub struct MapClient<S: Syscall = Kernel> {
    fd: RawFd,
    path: PathBuf,
    sys: S,
}

impl MapClient<Kernel> {
    /// Open the map pinned at `path` for reading and writing.
    ///
    /// # Errors
    /// [`MapError::Open`] if the pin does not exist, is not a BPF object, or
    /// access is denied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Self::open_with(Kernel, path, 0)
    }
}

impl<S: Syscall> MapClient<S> {
    /// Open the map pinned at `path` through `sys`.
    ///
    /// `file_flags` is 0, `BPF_F_RDONLY` or `BPF_F_WRONLY`.
    ///
    /// # Errors
    /// - [`MapError::Open`] if `BPF_OBJ_GET` fails
    /// - [`MapError::InvalidDescriptor`] if the kernel hands back a descriptor ≤ 0
    pub fn open_with(sys: S, path: impl AsRef<Path>, file_flags: u32) -> Result<Self, MapError> {
        let path = path.as_ref();
        let mut attr = ObjectAttr::get(path, file_flags);
        let ret = invoke(&sys, Command::ObjGet, &mut attr)
            .map_err(|source| MapError::Open { path: path.to_path_buf(), source })?;

        match RawFd::try_from(ret) {
            Ok(fd) if fd > 0 => {
                debug!("opened {} as fd {fd}", path.display());
                Ok(Self { fd, path: path.to_path_buf(), sys })
            }
            Ok(fd) => {
                if fd == 0 {
                    sys.close(fd);
                }
                Err(MapError::InvalidDescriptor { path: path.to_path_buf(), fd: ret })
            }
            Err(_) => Err(MapError::InvalidDescriptor { path: path.to_path_buf(), fd: ret }),
        }
    }

    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Path the map was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the value stored under `key` into `value`.
    ///
    /// `value` must be exactly the map's value size (times the possible CPU
    /// count for per-CPU maps). On error its contents are unspecified.
    ///
    /// # Errors
    /// [`MapError::Lookup`], including `ENOENT` when the key does not exist
    pub fn lookup(&self, key: &[u8], value: &mut [u8]) -> Result<(), MapError> {
        let mut attr = MapElemAttr::new(self.fd).key(key).value_out(value);
        invoke(&self.sys, Command::MapLookupElem, &mut attr)
            .map_err(|source| MapError::Lookup { fd: self.fd, source })?;
        Ok(())
    }

    /// Store `value` under `key`. `flags` is `BPF_ANY`, `BPF_NOEXIST` or `BPF_EXIST`.
    ///
    /// # Errors
    /// [`MapError::Update`] if the kernel rejects the update
    pub fn update(&self, key: &[u8], value: &[u8], flags: u64) -> Result<(), MapError> {
        let mut attr = MapElemAttr::new(self.fd).key(key).value_in(value).flags(flags);
        invoke(&self.sys, Command::MapUpdateElem, &mut attr)
            .map_err(|source| MapError::Update { fd: self.fd, source })?;
        Ok(())
    }

    /// Pin this map at another path on a BPF filesystem
    ///
    /// # Errors
    /// [`MapError::Pin`] if the path is invalid or already taken
    pub fn pin(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let path = path.as_ref();
        let mut attr = ObjectAttr::pin(self.fd, path);
        invoke(&self.sys, Command::ObjPin, &mut attr).map_err(|source| MapError::Pin {
            fd: self.fd,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Query type, key/value sizes and name of the map
    ///
    /// # Errors
    /// [`MapError::Info`] if the kernel rejects the query
    pub fn info(&self) -> Result<MapInfo, MapError> {
        let mut info = MapInfo::default();
        let mut attr = InfoAttr::new(self.fd, &mut info);
        invoke(&self.sys, Command::ObjGetInfoByFd, &mut attr)
            .map_err(|source| MapError::Info { fd: self.fd, source })?;
        Ok(info)
    }
}

impl<S: Syscall> Drop for MapClient<S> {
    fn drop(&mut self) {
        debug!("closing fd {} ({})", self.fd, self.path.display());
        self.sys.close(self.fd);
    }
}
