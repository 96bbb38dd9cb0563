//! Per-CPU counter reads
//!
//! [`PerCpuCounter`] wraps a [`MapClient`] on a single-key per-CPU map holding
//! one `u64` per CPU. The map shape is checked once when the counter is
//! opened; after that every read is a single lookup of `COUNTER_KEY` into a
//! scratch buffer sized for all possible CPUs.

use ip_hist_common::{COUNTER_KEY, KEY_SIZE, VALUE_SIZE};
use serde::Serialize;
use std::path::Path;

use super::map::MapClient;
use crate::bpf::{is_per_cpu_map, Kernel, MapInfo, Syscall};
use crate::cpu::possible_cpus;
use crate::domain::{CpuId, MapError};

/// One reading of every per-CPU counter slot, indexed by CPU
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: Vec<u64>,
}

impl Snapshot {
    /// Decode native-endian `u64` slots
    fn from_ne_bytes(bytes: &[u8]) -> Self {
        let values = bytes
            .chunks_exact(VALUE_SIZE)
            .map(|chunk| {
                let mut slot = [0u8; VALUE_SIZE];
                slot.copy_from_slice(chunk);
                u64::from_ne_bytes(slot)
            })
            .collect();
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Number of CPU slots
    #[must_use]
    pub fn cpus(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn get(&self, cpu: CpuId) -> Option<u64> {
        self.values.get(cpu.0 as usize).copied()
    }

    /// Sum over all CPUs
    #[must_use]
    pub fn total(&self) -> u64 {
        self.values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CpuId, u64)> + '_ {
        (0u32..).zip(self.values.iter()).map(|(cpu, v)| (CpuId(cpu), *v))
    }
}

impl From<Vec<u64>> for Snapshot {
    fn from(values: Vec<u64>) -> Self {
        Self { values }
    }
}

/// Reader for a pinned per-CPU `u64` counter map
///
/// Precondition on the pinned map: per-CPU type, 4-byte key, 8-byte value,
/// with the counter stored under key `0`.
#[derive(Debug)]
pub struct PerCpuCounter<S: Syscall = Kernel> {
    map: MapClient<S>,
    key: [u8; KEY_SIZE],
    scratch: Vec<u8>,
}

impl PerCpuCounter<Kernel> {
    /// Open the counter map pinned at `path`
    ///
    /// # Errors
    /// - [`MapError::CpuTopology`] if the possible CPU count cannot be read
    /// - [`MapError::Open`] / [`MapError::Info`] if the map cannot be opened or queried
    /// - [`MapError::Precondition`] if the map is not a per-CPU `u64` counter
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let cpus = possible_cpus().map_err(|e| MapError::CpuTopology(format!("{e:#}")))?;
        Self::with_client(MapClient::open(path)?, cpus.len())
    }
}

impl<S: Syscall> PerCpuCounter<S> {
    /// Wrap an open map, sizing reads for `cpus` value slots
    ///
    /// # Errors
    /// [`MapError::Info`] or [`MapError::Precondition`]
    pub fn with_client(map: MapClient<S>, cpus: usize) -> Result<Self, MapError> {
        let info = map.info()?;
        check_counter_map(&info, cpus).map_err(|reason| MapError::Precondition {
            path: map.path().to_path_buf(),
            reason,
        })?;

        Ok(Self { map, key: COUNTER_KEY.to_ne_bytes(), scratch: vec![0; cpus * VALUE_SIZE] })
    }

    /// Number of CPU slots in every snapshot
    #[must_use]
    pub fn cpus(&self) -> usize {
        self.scratch.len() / VALUE_SIZE
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.map.path()
    }

    /// Look up the counter and copy it into a new [`Snapshot`]
    ///
    /// # Errors
    /// [`MapError::Lookup`]; no snapshot is produced in that case
    pub fn read(&mut self) -> Result<Snapshot, MapError> {
        self.map.lookup(&self.key, &mut self.scratch)?;
        Ok(Snapshot::from_ne_bytes(&self.scratch))
    }
}

fn check_counter_map(info: &MapInfo, cpus: usize) -> Result<(), String> {
    if !is_per_cpu_map(info.map_type) {
        return Err(format!("map type {} is not a per-CPU map", info.map_type));
    }
    if info.key_size as usize != KEY_SIZE {
        return Err(format!("key size is {} bytes, expected {KEY_SIZE}", info.key_size));
    }
    if info.value_size as usize != VALUE_SIZE {
        return Err(format!("value size is {} bytes, expected {VALUE_SIZE}", info.value_size));
    }
    if cpus == 0 {
        return Err("no CPUs to read".to_string());
    }
    Ok(())
}
