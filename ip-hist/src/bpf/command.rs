//! `bpf(2)` command codes and flag values
//!
//! Values must match `enum bpf_cmd` and the flag defines in `linux/bpf.h`.
//! Only the stable prefix of the enum is listed.

use std::fmt;

/// First argument of the `bpf(2)` syscall
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MapCreate = 0,
    MapLookupElem = 1,
    MapUpdateElem = 2,
    MapDeleteElem = 3,
    MapGetNextKey = 4,
    ProgLoad = 5,
    ObjPin = 6,
    ObjGet = 7,
    ProgAttach = 8,
    ProgDetach = 9,
    ProgTestRun = 10,
    ProgGetNextId = 11,
    MapGetNextId = 12,
    ProgGetFdById = 13,
    MapGetFdById = 14,
    ObjGetInfoByFd = 15,
    ProgQuery = 16,
    RawTracepointOpen = 17,
    BtfLoad = 18,
    BtfGetFdById = 19,
    TaskFdQuery = 20,
}

impl Command {
    /// Raw command code as passed to the kernel
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Kernel name of the command, e.g. `BPF_OBJ_GET`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Command::MapCreate => "BPF_MAP_CREATE",
            Command::MapLookupElem => "BPF_MAP_LOOKUP_ELEM",
            Command::MapUpdateElem => "BPF_MAP_UPDATE_ELEM",
            Command::MapDeleteElem => "BPF_MAP_DELETE_ELEM",
            Command::MapGetNextKey => "BPF_MAP_GET_NEXT_KEY",
            Command::ProgLoad => "BPF_PROG_LOAD",
            Command::ObjPin => "BPF_OBJ_PIN",
            Command::ObjGet => "BPF_OBJ_GET",
            Command::ProgAttach => "BPF_PROG_ATTACH",
            Command::ProgDetach => "BPF_PROG_DETACH",
            Command::ProgTestRun => "BPF_PROG_TEST_RUN",
            Command::ProgGetNextId => "BPF_PROG_GET_NEXT_ID",
            Command::MapGetNextId => "BPF_MAP_GET_NEXT_ID",
            Command::ProgGetFdById => "BPF_PROG_GET_FD_BY_ID",
            Command::MapGetFdById => "BPF_MAP_GET_FD_BY_ID",
            Command::ObjGetInfoByFd => "BPF_OBJ_GET_INFO_BY_FD",
            Command::ProgQuery => "BPF_PROG_QUERY",
            Command::RawTracepointOpen => "BPF_RAW_TRACEPOINT_OPEN",
            Command::BtfLoad => "BPF_BTF_LOAD",
            Command::BtfGetFdById => "BPF_BTF_GET_FD_BY_ID",
            Command::TaskFdQuery => "BPF_TASK_FD_QUERY",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Flags for BPF_MAP_UPDATE_ELEM
pub const BPF_ANY: u64 = 0;
pub const BPF_NOEXIST: u64 = 1;
pub const BPF_EXIST: u64 = 2;

// `file_flags` for BPF_OBJ_GET
pub const BPF_F_RDONLY: u32 = 1 << 3;
pub const BPF_F_WRONLY: u32 = 1 << 4;

// Map types whose values are stored once per CPU
pub const BPF_MAP_TYPE_PERCPU_HASH: u32 = 5;
pub const BPF_MAP_TYPE_PERCPU_ARRAY: u32 = 6;
pub const BPF_MAP_TYPE_LRU_PERCPU_HASH: u32 = 10;

/// True if lookups on this map type return one value slot per possible CPU
#[must_use]
pub fn is_per_cpu_map(map_type: u32) -> bool {
    matches!(
        map_type,
        BPF_MAP_TYPE_PERCPU_HASH | BPF_MAP_TYPE_PERCPU_ARRAY | BPF_MAP_TYPE_LRU_PERCPU_HASH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes_match_kernel() {
        assert_eq!(Command::MapLookupElem.as_raw(), 1);
        assert_eq!(Command::MapUpdateElem.as_raw(), 2);
        assert_eq!(Command::ObjPin.as_raw(), 6);
        assert_eq!(Command::ObjGet.as_raw(), 7);
        assert_eq!(Command::ObjGetInfoByFd.as_raw(), 15);
        assert_eq!(Command::TaskFdQuery.as_raw(), 20);
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::ObjGet.to_string(), "BPF_OBJ_GET");
    }

    #[test]
    fn test_per_cpu_map_types() {
        assert!(is_per_cpu_map(BPF_MAP_TYPE_PERCPU_ARRAY));
        assert!(is_per_cpu_map(BPF_MAP_TYPE_PERCPU_HASH));
        assert!(is_per_cpu_map(BPF_MAP_TYPE_LRU_PERCPU_HASH));
        // BPF_MAP_TYPE_ARRAY
        assert!(!is_per_cpu_map(2));
    }
}
