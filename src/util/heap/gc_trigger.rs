use crate::plan::gc_task::{GCTask, GCTaskCause};
use crate::util::conversions::bytes_to_formatted_string;
use crate::util::notification::GCListener;
use crate::util::options::{GcTriggerType, Options};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// GCTrigger decides when the heap has grown enough to warrant a collection. It is checked
/// before every allocation, and learns about finished collections as a [`GCListener`].
pub struct GCTrigger {
    pub policy: Arc<dyn GCTriggerPolicy>,
}

impl GCTrigger {
    pub fn new(options: &Options, generational: bool) -> Self {
        let policy: Arc<dyn GCTriggerPolicy> = match options.gc_trigger_type {
            GcTriggerType::HeapTrigger => Arc::new(HeapTrigger::new(options, generational)),
            GcTriggerType::DebugTrigger => Arc::new(DebugTrigger::new(options.debug_trigger_start)),
        };
        debug!("Create GC trigger {:?}", policy.trigger_type());
        GCTrigger { policy }
    }

    /// Should a collection run before allocating more? `footprint` is the number of bytes
    /// currently occupied by objects.
    pub fn poll(&self, footprint: usize) -> bool {
        let required = self.policy.is_gc_required(footprint);
        if required {
            info!(
                "[POLL] {:?}: triggering collection at {}",
                self.policy.trigger_type(),
                bytes_to_formatted_string(footprint)
            );
        }
        required
    }

    /// The trigger as a listener, to be told about finished collections.
    pub fn listener(&self) -> Arc<dyn GCListener> {
        self.policy.clone().as_listener()
    }
}

/// A triggering policy. Policies see every finished collection through their
/// [`GCListener`] hooks and may adapt their threshold.
pub trait GCTriggerPolicy: GCListener {
    fn trigger_type(&self) -> GcTriggerType;

    fn is_gc_required(&self, footprint: usize) -> bool;

    fn as_listener(self: Arc<Self>) -> Arc<dyn GCListener>;
}

/// Fires once the footprint reaches a target. After each collection the target is moved to
/// the surviving heap size plus a margin proportional to it.
pub struct HeapTrigger {
    target_footprint: AtomicUsize,
    skip_gc_count: AtomicUsize,
    percent_threshold: usize,
    min_extend_size: usize,
    max_extend_size: usize,
    /// Young-only collections of a generational heap do not move the target.
    generational: bool,
}

impl HeapTrigger {
    pub fn new(options: &Options, generational: bool) -> Self {
        let target = (options.min_heap_size_for_trigger / 100) * options.gc_trigger_percent_threshold;
        debug!(
            "Heap trigger initial target {}",
            bytes_to_formatted_string(target)
        );
        HeapTrigger {
            target_footprint: AtomicUsize::new(target),
            skip_gc_count: AtomicUsize::new(options.skip_startup_gc_count),
            percent_threshold: options.gc_trigger_percent_threshold,
            min_extend_size: options.min_extend_size,
            max_extend_size: options.max_extend_size,
            generational,
        }
    }

    pub fn target_footprint(&self) -> usize {
        self.target_footprint.load(Ordering::Relaxed)
    }

    fn compute_target(&self, heap_size_before_gc: usize, heap_size: usize) -> usize {
        let mut delta = (heap_size / 100) * self.percent_threshold;
        if heap_size > heap_size_before_gc {
            delta = delta.min(self.max_extend_size);
        } else {
            delta = delta.max((heap_size_before_gc - heap_size) / 2);
        }
        delta = delta.max(self.min_extend_size);
        heap_size + delta
    }
}

impl GCListener for HeapTrigger {
    fn gc_finished(&self, task: &GCTask, heap_size_before_gc: usize, heap_size: usize) {
        if self.generational && task.cause == GCTaskCause::YoungGc {
            return;
        }
        let target = self.compute_target(heap_size_before_gc, heap_size);
        debug!(
            "Heap trigger target {} -> {} (heap {} -> {})",
            bytes_to_formatted_string(self.target_footprint()),
            bytes_to_formatted_string(target),
            bytes_to_formatted_string(heap_size_before_gc),
            bytes_to_formatted_string(heap_size)
        );
        self.target_footprint.store(target, Ordering::Relaxed);
    }
}

impl GCTriggerPolicy for HeapTrigger {
    fn trigger_type(&self) -> GcTriggerType {
        GcTriggerType::HeapTrigger
    }

    fn is_gc_required(&self, footprint: usize) -> bool {
        if footprint < self.target_footprint() {
            return false;
        }
        // Ignore the first threshold crossings during startup.
        let skipped = self
            .skip_gc_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        !skipped
    }

    fn as_listener(self: Arc<Self>) -> Arc<dyn GCListener> {
        self
    }
}

/// Fires on every check from the `start`-th on. Only useful for stress testing.
pub struct DebugTrigger {
    start: usize,
    checks: AtomicUsize,
}

impl DebugTrigger {
    pub fn new(start: usize) -> Self {
        DebugTrigger {
            start,
            checks: AtomicUsize::new(0),
        }
    }
}

impl GCListener for DebugTrigger {}

impl GCTriggerPolicy for DebugTrigger {
    fn trigger_type(&self) -> GcTriggerType {
        GcTriggerType::DebugTrigger
    }

    fn is_gc_required(&self, _footprint: usize) -> bool {
        self.checks.fetch_add(1, Ordering::Relaxed) >= self.start
    }

    fn as_listener(self: Arc<Self>) -> Arc<dyn GCListener> {
        self
    }
}
