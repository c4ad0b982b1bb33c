use crate::global_state::GlobalState;
use crate::util::statistics::GcStats;

use bytemuck::NoUninit;
use enum_map::Enum;
use std::time::Instant;
use strum_macros::IntoStaticStr;

/// The step a collection is in. Allocation reads the phase to decide the mark state of new
/// objects.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, NoUninit, Enum, IntoStaticStr)]
pub enum GCPhase {
    Idle = 0,
    /// A collection owns the heap but has not entered a specific phase.
    Running,
    CollectRoots,
    InitialMark,
    /// Concurrent marking of the tenured space.
    Mark,
    MarkYoung,
    Remark,
    CollectYoungAndMove,
    SweepStringTable,
    SweepStringTableYoung,
    /// Sweeping the tenured space, concurrently with mutators for the generational collector.
    Sweep,
    Cleanup,
}

impl GCPhase {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// A short name for logs.
    pub fn abbreviation(self) -> &'static str {
        match self {
            GCPhase::Idle => "Idle",
            GCPhase::Running => "RunPhases",
            GCPhase::CollectRoots => "CollectRoots",
            GCPhase::InitialMark => "InitMark",
            GCPhase::Mark => "Mark",
            GCPhase::MarkYoung => "MarkYoung",
            GCPhase::Remark => "Remark",
            GCPhase::CollectYoungAndMove => "CollectYoungAndMove",
            GCPhase::SweepStringTable => "SweepStrings",
            GCPhase::SweepStringTableYoung => "SweepStringsYoung",
            GCPhase::Sweep => "Sweep",
            GCPhase::Cleanup => "Cleanup",
        }
    }

    /// Phases during which mutators run alongside the collector.
    pub fn is_concurrent(self) -> bool {
        matches!(self, GCPhase::Mark | GCPhase::Sweep)
    }
}

/// Sets the collector phase for a scope. Dropping the guard restores the previous phase and
/// records the time spent.
pub struct GCScopedPhase<'a> {
    state: &'a GlobalState,
    stats: &'a GcStats,
    phase: GCPhase,
    previous: GCPhase,
    start: Instant,
}

impl<'a> GCScopedPhase<'a> {
    pub fn new(state: &'a GlobalState, stats: &'a GcStats, phase: GCPhase) -> Self {
        let previous = state.phase();
        debug!("Phase {} -> {}", previous.abbreviation(), phase.abbreviation());
        state.set_phase(phase);
        GCScopedPhase {
            state,
            stats,
            phase,
            previous,
            start: Instant::now(),
        }
    }

    pub fn phase(&self) -> GCPhase {
        self.phase
    }
}

impl Drop for GCScopedPhase<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.stats.record_phase(self.phase, elapsed);
        debug!(
            "Phase {} done in {:?}, back to {}",
            self.phase.abbreviation(),
            elapsed,
            self.previous.abbreviation()
        );
        self.state.set_phase(self.previous);
    }
}
