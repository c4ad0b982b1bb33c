//! The part of a collection shared by every collector: the phase-sequence trait, the closed
//! set of collectors, and the request protocol that serializes collections.

use crate::heap_manager::HeapManager;
use crate::plan::barriers::Barrier;
use crate::plan::gc_task::{GCTask, GCTaskCause};
use crate::plan::generational::GenGC;
use crate::plan::stw::StwGC;
use crate::util::address::MemRange;
use crate::util::heap_object::HeapObject;
use crate::util::marker::GCMarker;
use crate::util::options::{GcType, Options};
use crate::util::rendezvous::SafepointGuard;
use crate::util::sanity::heap_verifier::HeapVerifier;
use crate::util::ObjectReference;
use crate::vm::{Collection, MonitorPool, VMBinding};

use std::time::{Duration, Instant};

/// How long a requester sleeps before retrying when another collection still owns the heap.
const WAIT_FOR_IDLE_INTERVAL: Duration = Duration::from_millis(1);

/// A collector is a phase sequence run under a safepoint, plus the object-header protocol
/// the allocator and the barriers need to agree with it.
pub trait GarbageCollector<VM: VMBinding>: Send + Sync {
    fn gc_type(&self) -> GcType;

    fn is_generational(&self) -> bool;

    fn marker(&self) -> &GCMarker;

    /// The barrier mutators must use for reference stores into the heap of this collector.
    fn create_barrier(&self) -> Box<dyn Barrier>;

    /// Set the mark state of a newly allocated object so that a collection in progress
    /// neither frees it nor mistakes it for a survivor of an old cycle.
    fn init_gc_bits(&self, heap: &HeapManager<VM>, object: ObjectReference, header: &HeapObject);

    fn is_marked(&self, object: &HeapObject) -> bool {
        self.marker().is_marked(object)
    }

    fn un_mark_object(&self, object: &HeapObject);

    /// Is a concurrent mark in progress? The pre-write barrier logs overwritten referents
    /// while this holds.
    fn is_concurrent_marking(&self) -> bool {
        false
    }

    /// Run the phases of one collection. Called with the heap owned through `guard`; a
    /// collector with concurrent phases lets mutators run by opening a concurrent scope on it.
    fn run_phases_impl(&self, heap: &HeapManager<VM>, task: &GCTask, guard: &mut SafepointGuard);
}

/// The collectors this crate provides.
pub enum Collector<VM: VMBinding> {
    Generational(GenGC<VM>),
    StopTheWorld(StwGC<VM>),
}

impl<VM: VMBinding> Collector<VM> {
    /// Create the collector selected by the options. `heap_range` is the address range of
    /// every space, which the generational card table has to cover.
    pub fn new(options: &Options, heap_range: MemRange) -> Self {
        match options.gc_type {
            GcType::GenGc => Collector::Generational(GenGC::new(heap_range)),
            GcType::Stw => Collector::StopTheWorld(StwGC::new()),
        }
    }

    fn as_dyn(&self) -> &dyn GarbageCollector<VM> {
        match self {
            Collector::Generational(gc) => gc,
            Collector::StopTheWorld(gc) => gc,
        }
    }
}

impl<VM: VMBinding> GarbageCollector<VM> for Collector<VM> {
    fn gc_type(&self) -> GcType {
        self.as_dyn().gc_type()
    }

    fn is_generational(&self) -> bool {
        self.as_dyn().is_generational()
    }

    fn marker(&self) -> &GCMarker {
        self.as_dyn().marker()
    }

    fn create_barrier(&self) -> Box<dyn Barrier> {
        self.as_dyn().create_barrier()
    }

    fn init_gc_bits(&self, heap: &HeapManager<VM>, object: ObjectReference, header: &HeapObject) {
        self.as_dyn().init_gc_bits(heap, object, header)
    }

    fn un_mark_object(&self, object: &HeapObject) {
        self.as_dyn().un_mark_object(object)
    }

    fn is_concurrent_marking(&self) -> bool {
        self.as_dyn().is_concurrent_marking()
    }

    fn run_phases_impl(&self, heap: &HeapManager<VM>, task: &GCTask, guard: &mut SafepointGuard) {
        self.as_dyn().run_phases_impl(heap, task, guard)
    }
}

/// Has a collection that covers `task` completed since the requester read `old_counter`?
fn is_already_satisfied<VM: VMBinding>(heap: &HeapManager<VM>, task: &GCTask, old_counter: u64) -> bool {
    let state = heap.state();
    if state.gc_counter() > old_counter && task.is_satisfied_by(state.last_cause()) {
        debug!(
            "{:?} is satisfied by a {:?} collection that finished meanwhile",
            task,
            state.last_cause()
        );
        true
    } else {
        false
    }
}

/// Wait until no collection is in progress and claim the collector. A collection in a
/// concurrent phase has released the safepoint and needs it back to finish, so the guard is
/// released while waiting.
pub(crate) fn wait_for_idle<VM: VMBinding>(heap: &HeapManager<VM>, guard: &mut SafepointGuard) {
    while !heap.state().try_begin_gc() {
        trace!("A collection is still running, retry later");
        let _scope = guard.concurrent_scope(true);
        std::thread::sleep(WAIT_FOR_IDLE_INTERVAL);
    }
}

/// Request a collection for `task` and wait until it has happened. Returns false if a
/// collection run by another thread already satisfied the request.
///
/// Exactly one thread at a time runs the phase sequence; the others block in the safepoint
/// and then short-circuit on the completion counter.
pub(crate) fn wait_for_gc<VM: VMBinding>(heap: &HeapManager<VM>, task: GCTask) -> bool {
    heap.notifications().fire_start_event(&task);
    let old_counter = heap.state().gc_counter();
    let ran = {
        let mut guard = heap.rendezvous().safepoint_begin(task.caller);
        if is_already_satisfied(heap, &task, old_counter) {
            false
        } else {
            wait_for_idle(heap, &mut guard);
            if is_already_satisfied(heap, &task, old_counter) {
                heap.state().end_gc();
                false
            } else {
                run_phases(heap, &task, &mut guard);
                true
            }
        }
    };
    heap.notifications().fire_finish_event(&task);
    if ran {
        VM::VMCollection::handle_gc_finished();
        VM::VMCollection::handle_enqueue_references();
    }
    ran
}

fn run_phases<VM: VMBinding>(heap: &HeapManager<VM>, task: &GCTask, guard: &mut SafepointGuard) {
    let state = heap.state();
    let stats = heap.stats();
    let options = heap.options();

    if options.pre_gc_heap_verification {
        verify("Pre", heap, options);
    }

    stats.start_cycle();
    let start = Instant::now();
    let heap_size_before_gc = heap.footprint();
    info!(
        "GC #{} start: {:?}, heap {}",
        state.gc_counter() + 1,
        task.cause,
        crate::util::conversions::bytes_to_formatted_string(heap_size_before_gc)
    );
    heap.notifications().fire_gc_started(task, heap_size_before_gc);

    let deflated = VM::VMMonitorPool::deflate_monitors();
    if deflated > 0 {
        debug!("Deflated {} idle monitors", deflated);
    }

    heap.collector().run_phases_impl(heap, task, guard);

    let heap_size = heap.footprint();
    heap.notifications()
        .fire_gc_finished(task, heap_size_before_gc, heap_size);

    if options.post_gc_heap_verification {
        verify("Post", heap, options);
    }

    stats.end_cycle(start.elapsed());
    info!(
        "GC #{} end: heap {}",
        state.gc_counter() + 1,
        crate::util::conversions::bytes_to_formatted_string(heap_size)
    );
    state.complete_gc(task.cause);
    state.end_gc();
}

fn verify<VM: VMBinding>(when: &str, heap: &HeapManager<VM>, options: &Options) {
    let failures = HeapVerifier::new(heap).verify_all();
    if failures > 0 {
        error!("{} GC heap verification found {} failures", when, failures);
        if options.fail_on_heap_verification {
            panic!("{} GC heap verification failed with {} failures", when, failures);
        }
    } else {
        debug!("{} GC heap verification passed", when);
    }
}

/// Does `task` ask for a tenured collection on top of the young one? `period_elapsed` says
/// whether enough young collections have run since the last tenured one.
pub(crate) fn should_run_tenured_gc<VM: VMBinding>(
    heap: &HeapManager<VM>,
    task: &GCTask,
    period_elapsed: bool,
) -> bool {
    let state = heap.state();
    if state.is_fork_preparation() || task.cause == GCTaskCause::PygoteFork {
        return true;
    }
    if state.is_tenured_gc_disabled() && task.cause != GCTaskCause::Oom {
        return false;
    }
    matches!(
        task.cause,
        GCTaskCause::Oom | GCTaskCause::Explicit | GCTaskCause::HeapUsageThreshold
    ) && period_elapsed
}
