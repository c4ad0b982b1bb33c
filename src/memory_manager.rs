//! VM-to-collector interface: safe Rust APIs.
//!
//! This module is the surface a VM binding uses. A binding creates one [`HeapManager`] with
//! [`gc_init`], keeps the returned `Arc`, binds a [`Mutator`] for every thread that runs
//! managed code, and goes through the mutator for allocation and reference stores. Exposing
//! these functions to native code, and the unsafety that comes with it, is up to the binding.

use crate::heap_manager::HeapManager;
use crate::plan::gc_task::GCTaskCause;
use crate::plan::Mutator;
use crate::util::alloc::AllocationError;
use crate::util::heap_object::ClassId;
use crate::util::notification::{GCListener, GarbageCollectorListener};
use crate::util::options::Options;
use crate::util::sanity::heap_verifier;
use crate::util::{MutatorId, ObjectReference};
use crate::vm::VMBinding;

use std::sync::Arc;

/// Initialize a heap. This will attempt to initialize a logger. If the VM would like to use
/// its own logger, it should initialize the logger before calling this function.
///
/// Arguments:
/// * `options`: The options for the heap, e.g. from [`Options::default`], which reads
///   `GENGC_` environment variables.
pub fn gc_init<VM: VMBinding>(options: Options) -> Arc<HeapManager<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("GenGC initialized the logger."),
        Err(_) => debug!(
            "GenGC failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    Arc::new(HeapManager::new(options))
}

/// Bind the current thread to the heap. The mutator must poll for safepoints from now on,
/// and is unbound when dropped.
///
/// This blocks while a safepoint is held.
pub fn bind_mutator<VM: VMBinding>(heap: &Arc<HeapManager<VM>>) -> Box<Mutator<VM>> {
    Box::new(Mutator::new(heap.clone()))
}

/// Unbind a mutator that is no longer needed.
pub fn destroy_mutator<VM: VMBinding>(mutator: Box<Mutator<VM>>) {
    drop(mutator);
}

/// Allocate a movable object with `num_fields` reference fields, all null, and
/// `payload_bytes` of non-reference data.
///
/// Arguments:
/// * `mutator`: The allocating mutator.
/// * `class`: The class of the object. It is installed after the object is set up.
/// * `num_fields`: The number of reference fields.
/// * `payload_bytes`: The size of the non-reference data.
pub fn alloc<VM: VMBinding>(
    mutator: &Mutator<VM>,
    class: ClassId,
    num_fields: usize,
    payload_bytes: usize,
) -> Result<ObjectReference, AllocationError> {
    mutator.alloc(class, num_fields, payload_bytes)
}

/// Allocate an object that never moves.
pub fn alloc_non_movable<VM: VMBinding>(
    mutator: &Mutator<VM>,
    class: ClassId,
    num_fields: usize,
    payload_bytes: usize,
) -> Result<ObjectReference, AllocationError> {
    mutator.alloc_non_movable(class, num_fields, payload_bytes)
}

/// Store a reference into a field, running the write barrier of the collector.
pub fn object_reference_write<VM: VMBinding>(
    mutator: &Mutator<VM>,
    src: ObjectReference,
    index: usize,
    target: Option<ObjectReference>,
) {
    mutator.write_field(src, index, target)
}

/// Load a reference field.
pub fn object_reference_read<VM: VMBinding>(
    mutator: &Mutator<VM>,
    src: ObjectReference,
    index: usize,
) -> Option<ObjectReference> {
    mutator.read_field(src, index)
}

/// Park the mutator if a safepoint is requested.
pub fn safepoint_poll<VM: VMBinding>(mutator: &Mutator<VM>) {
    mutator.safepoint_poll()
}

/// The application asked for a collection, e.g. through `System.gc()`. Returns once a
/// collection that covers the request has finished.
///
/// Arguments:
/// * `heap`: The heap.
/// * `caller`: The requesting mutator, if the request comes from a mutator thread.
pub fn handle_user_collection_request<VM: VMBinding>(
    heap: &HeapManager<VM>,
    caller: Option<&Mutator<VM>>,
) {
    heap.collect(GCTaskCause::Explicit, caller.map(|m| m.id()));
}

/// Request a collection with a specific cause. Returns false if a collection that finished
/// meanwhile already covered it.
pub fn request_collection<VM: VMBinding>(
    heap: &HeapManager<VM>,
    cause: GCTaskCause,
    caller: Option<&Mutator<VM>>,
) -> bool {
    heap.collect(cause, caller.map(|m| m.id()))
}

/// Verify the heap with every mutator paused. Returns the number of references to objects
/// that are not live.
pub fn verify_heap<VM: VMBinding>(heap: &HeapManager<VM>, caller: Option<&Mutator<VM>>) -> usize {
    heap_verifier::verify_all_paused(heap, caller.map(|m| m.id()))
}

/// Did the last allocation of `mutator` run out of memory? The VM should turn a pending
/// condition into an exception. Clears the condition.
pub fn take_pending_oom<VM: VMBinding>(heap: &HeapManager<VM>, mutator: MutatorId) -> bool {
    heap.take_pending_oom(mutator)
}

/// Add a listener told about every collection with the heap size before and after.
pub fn add_gc_listener<VM: VMBinding>(heap: &HeapManager<VM>, listener: Arc<dyn GCListener>) {
    heap.notifications().add_gc_listener(listener)
}

/// Add a tooling listener told when a collection request starts and finishes.
pub fn add_collector_listener<VM: VMBinding>(
    heap: &HeapManager<VM>,
    listener: Arc<dyn GarbageCollectorListener>,
) {
    heap.notifications().add_collector_listener(listener)
}

/// The runtime is about to fork worker processes. Runs a full collection, and every
/// collection until [`post_zygote_fork`] includes the tenured space.
pub fn pre_zygote_fork<VM: VMBinding>(heap: &HeapManager<VM>, caller: Option<&Mutator<VM>>) {
    heap.pre_zygote_fork(caller.map(|m| m.id()))
}

pub fn post_zygote_fork<VM: VMBinding>(heap: &HeapManager<VM>) {
    heap.post_zygote_fork()
}

/// Tenured collections are skipped from here until [`post_startup`], unless an allocation
/// runs out of memory.
pub fn pre_startup<VM: VMBinding>(heap: &HeapManager<VM>) {
    heap.pre_startup()
}

pub fn post_startup<VM: VMBinding>(heap: &HeapManager<VM>) {
    heap.post_startup()
}

/// The number of bytes occupied by objects.
pub fn used_bytes<VM: VMBinding>(heap: &HeapManager<VM>) -> usize {
    heap.footprint()
}

/// The number of collections completed so far.
pub fn gc_count<VM: VMBinding>(heap: &HeapManager<VM>) -> u64 {
    heap.state().gc_counter()
}
