//! Per-cycle and accumulated collection statistics.

use crate::plan::phase::GCPhase;
use crate::util::conversions::bytes_to_formatted_string;

use enum_map::EnumMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Counters of one collection cycle, or the sum over many.
#[derive(Clone, Debug, Default)]
pub struct GcCycleStats {
    pub young_moved_objects: usize,
    pub young_moved_bytes: usize,
    pub young_freed_objects: usize,
    pub young_freed_bytes: usize,
    pub tenured_freed_objects: usize,
    pub tenured_freed_bytes: usize,
    /// Did the cycle include a tenured collection?
    pub tenured_collections: usize,
    pub phase_times: EnumMap<GCPhase, Duration>,
    /// Time mutators were stopped.
    pub pause_time: Duration,
    /// Time the collector ran alongside mutators.
    pub concurrent_time: Duration,
}

impl GcCycleStats {
    pub fn reclaimed_bytes(&self) -> usize {
        self.young_freed_bytes + self.tenured_freed_bytes
    }

    fn accumulate(&mut self, other: &GcCycleStats) {
        self.young_moved_objects += other.young_moved_objects;
        self.young_moved_bytes += other.young_moved_bytes;
        self.young_freed_objects += other.young_freed_objects;
        self.young_freed_bytes += other.young_freed_bytes;
        self.tenured_freed_objects += other.tenured_freed_objects;
        self.tenured_freed_bytes += other.tenured_freed_bytes;
        self.tenured_collections += other.tenured_collections;
        for (phase, time) in other.phase_times.iter() {
            self.phase_times[phase] += *time;
        }
        self.pause_time += other.pause_time;
        self.concurrent_time += other.concurrent_time;
    }
}

#[derive(Default)]
struct StatsInner {
    cycles: u64,
    current: GcCycleStats,
    last: GcCycleStats,
    total: GcCycleStats,
}

#[derive(Default)]
pub struct GcStats {
    inner: Mutex<StatsInner>,
}

impl GcStats {
    fn lock(&self) -> MutexGuard<'_, StatsInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn start_cycle(&self) {
        self.lock().current = GcCycleStats::default();
    }

    pub(crate) fn record_phase(&self, phase: GCPhase, time: Duration) {
        self.lock().current.phase_times[phase] += time;
    }

    pub(crate) fn record_young(&self, moved: (usize, usize), freed: (usize, usize)) {
        let mut inner = self.lock();
        inner.current.young_moved_objects += moved.0;
        inner.current.young_moved_bytes += moved.1;
        inner.current.young_freed_objects += freed.0;
        inner.current.young_freed_bytes += freed.1;
    }

    pub(crate) fn record_tenured(&self, freed_objects: usize, freed_bytes: usize) {
        let mut inner = self.lock();
        inner.current.tenured_collections += 1;
        inner.current.tenured_freed_objects += freed_objects;
        inner.current.tenured_freed_bytes += freed_bytes;
    }

    pub(crate) fn record_concurrent(&self, time: Duration) {
        self.lock().current.concurrent_time += time;
    }

    /// Close the current cycle. `total_time` is the whole time the cycle owned the collector.
    pub(crate) fn end_cycle(&self, total_time: Duration) {
        let mut inner = self.lock();
        inner.cycles += 1;
        let mut cycle = std::mem::take(&mut inner.current);
        cycle.pause_time = total_time.saturating_sub(cycle.concurrent_time);
        info!(
            "GC #{} done: moved {} young objects ({}), freed {} young ({}) and {} tenured ({}), pause {:?}, concurrent {:?}",
            inner.cycles,
            cycle.young_moved_objects,
            bytes_to_formatted_string(cycle.young_moved_bytes),
            cycle.young_freed_objects,
            bytes_to_formatted_string(cycle.young_freed_bytes),
            cycle.tenured_freed_objects,
            bytes_to_formatted_string(cycle.tenured_freed_bytes),
            cycle.pause_time,
            cycle.concurrent_time,
        );
        for (phase, time) in cycle.phase_times.iter().filter(|(_, t)| !t.is_zero()) {
            debug!("  {:<20} {:?}", phase.abbreviation(), time);
        }
        inner.total.accumulate(&cycle);
        inner.last = cycle;
    }

    /// The number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.lock().cycles
    }

    pub fn last_cycle(&self) -> GcCycleStats {
        self.lock().last.clone()
    }

    pub fn total(&self) -> GcCycleStats {
        self.lock().total.clone()
    }

    /// Bytes reclaimed by the last completed cycle.
    pub fn last_reclaimed_bytes(&self) -> usize {
        self.lock().last.reclaimed_bytes()
    }
}
