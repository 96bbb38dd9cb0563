//! Bounded per-CPU series backing the chart
//!
//! Keeps the last `max_len` readings for every CPU plus the most recent
//! snapshot for the legend. Pure data, no terminal involved.

use std::collections::VecDeque;

use crate::counter::Snapshot;

#[derive(Debug, Clone)]
pub struct History {
    max_len: usize,
    series: Vec<VecDeque<u64>>,
    latest: Option<Snapshot>,
    received: u64,
}

impl History {
    /// `max_len` is clamped to at least one point per series
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self { max_len: max_len.max(1), series: Vec::new(), latest: None, received: 0 }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.series.len() < snapshot.cpus() {
            self.series.resize_with(snapshot.cpus(), VecDeque::new);
        }
        for (series, value) in self.series.iter_mut().zip(snapshot.values()) {
            if series.len() == self.max_len {
                series.pop_front();
            }
            series.push_back(*value);
        }
        self.latest = Some(snapshot);
        self.received += 1;
    }

    /// Drop all plotted points; the legend keeps the last reading
    pub fn clear(&mut self) {
        self.series.clear();
    }

    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of CPU series currently plotted
    #[must_use]
    pub fn cpus(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    /// Snapshots received since start (clearing does not reset it)
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Largest value across all plotted points
    #[must_use]
    pub fn max_value(&self) -> u64 {
        self.series.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Chart points `(sample index, value)` for one CPU
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn points(&self, cpu: usize) -> Vec<(f64, f64)> {
        self.series.get(cpu).map_or_else(Vec::new, |series| {
            series.iter().enumerate().map(|(i, v)| (i as f64, *v as f64)).collect()
        })
    }
}
