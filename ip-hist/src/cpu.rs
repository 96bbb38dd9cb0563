//! CPU utility functions
//!
//! Utilities for querying CPU information from /sys filesystem.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::domain::CpuId;

const POSSIBLE_CPUS: &str = "/sys/devices/system/cpu/possible";

/// Get list of possible CPU IDs from /sys/devices/system/cpu/possible
///
/// Per-CPU maps hold one value slot per *possible* CPU, which can be more than
/// the online CPUs (hotplug, offline cores), so this is the count that sizes
/// lookup buffers.
pub fn possible_cpus() -> Result<Vec<CpuId>> {
    read_cpu_list(POSSIBLE_CPUS)
}

/// Read and parse a sysfs CPU list file
pub fn read_cpu_list(path: impl AsRef<Path>) -> Result<Vec<CpuId>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_cpu_list(&content).with_context(|| format!("Malformed CPU list in {}", path.display()))
}

/// Parse a CPU list like "0-3" or "0-3,8-11" (NUMA systems) or "5"
pub fn parse_cpu_list(content: &str) -> Result<Vec<CpuId>> {
    let mut cpus = Vec::new();

    for range in content.trim().split(',') {
        if let Some((start, end)) = range.split_once('-') {
            let start: u32 = start.trim().parse()?;
            let end: u32 = end.trim().parse()?;
            if end < start {
                bail!("descending CPU range {range:?}");
            }
            cpus.extend((start..=end).map(CpuId));
        } else {
            let cpu: u32 = range.trim().parse()?;
            cpus.push(CpuId(cpu));
        }
    }

    Ok(cpus)
}
