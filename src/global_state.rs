use crate::plan::gc_task::GCTaskCause;
use crate::plan::phase::GCPhase;
use crate::util::MutatorId;

use atomic::{Atomic, Ordering};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Mutex;

/// Collection state shared between mutators and the collector.
pub struct GlobalState {
    /// The number of completed collections. Incremented once a collection has finished.
    gc_counter: AtomicU64,
    /// The cause of the last completed collection.
    last_cause: Atomic<GCTaskCause>,
    phase: Atomic<GCPhase>,
    /// Mutators with an out-of-memory condition the VM has not picked up yet.
    pending_oom: Mutex<HashSet<MutatorId>>,
    /// Set between `pre_zygote_fork` and `post_zygote_fork`.
    fork_preparation: AtomicBool,
    /// Set between `pre_startup` and `post_startup`.
    tenured_gc_disabled: AtomicBool,
}

impl GlobalState {
    pub fn gc_counter(&self) -> u64 {
        self.gc_counter.load(Ordering::Acquire)
    }

    pub fn last_cause(&self) -> GCTaskCause {
        self.last_cause.load(Ordering::Acquire)
    }

    /// Record a finished collection. The cause is published before the counter, so a reader
    /// that sees the new count also sees its cause.
    pub(crate) fn complete_gc(&self, cause: GCTaskCause) {
        self.last_cause.store(cause, Ordering::Release);
        self.gc_counter.fetch_add(1, Ordering::AcqRel);
    }

    pub fn phase(&self) -> GCPhase {
        self.phase.load(Ordering::Acquire)
    }

    pub(crate) fn set_phase(&self, phase: GCPhase) {
        self.phase.store(phase, Ordering::Release);
    }

    /// Move from `Idle` to `Running`. Fails if a collection is in progress.
    pub(crate) fn try_begin_gc(&self) -> bool {
        self.phase
            .compare_exchange(
                GCPhase::Idle,
                GCPhase::Running,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn end_gc(&self) {
        let old = self.phase.swap(GCPhase::Idle, Ordering::AcqRel);
        debug_assert_eq!(old, GCPhase::Running, "Collection ended in phase {:?}", old);
    }

    pub fn is_gc_in_progress(&self) -> bool {
        self.phase() != GCPhase::Idle
    }

    pub(crate) fn set_pending_oom(&self, mutator: MutatorId) {
        self.pending_oom
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(mutator);
    }

    pub(crate) fn clear_pending_oom(&self, mutator: MutatorId) {
        self.pending_oom
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&mutator);
    }

    /// Take the pending out-of-memory condition of a mutator, if it has one.
    pub fn take_pending_oom(&self, mutator: MutatorId) -> bool {
        self.pending_oom
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&mutator)
    }

    pub fn has_pending_oom(&self, mutator: MutatorId) -> bool {
        self.pending_oom
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&mutator)
    }

    pub fn is_fork_preparation(&self) -> bool {
        self.fork_preparation.load(Ordering::Acquire)
    }

    pub(crate) fn set_fork_preparation(&self, value: bool) {
        self.fork_preparation.store(value, Ordering::Release);
    }

    pub fn is_tenured_gc_disabled(&self) -> bool {
        self.tenured_gc_disabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_tenured_gc_disabled(&self, value: bool) {
        self.tenured_gc_disabled.store(value, Ordering::Release);
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        GlobalState {
            gc_counter: AtomicU64::new(0),
            last_cause: Atomic::new(GCTaskCause::Invalid),
            phase: Atomic::new(GCPhase::Idle),
            pending_oom: Mutex::new(HashSet::new()),
            fork_preparation: AtomicBool::new(false),
            tenured_gc_disabled: AtomicBool::new(false),
        }
    }
}
