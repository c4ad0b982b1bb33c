//! A diagnostic walk over the heap. It checks that every reference held by an object or a
//! root points to a live object, and counts the references that do not. It never changes
//! the object graph.

use crate::heap_manager::HeapManager;
use crate::plan::global::wait_for_idle;
use crate::util::heap_object::HeapObject;
use crate::util::{MutatorId, ObjectReference};
use crate::vm::*;

pub struct HeapVerifier<'a, VM: VMBinding> {
    heap: &'a HeapManager<VM>,
}

impl<'a, VM: VMBinding> HeapVerifier<'a, VM> {
    pub fn new(heap: &'a HeapManager<VM>) -> Self {
        HeapVerifier { heap }
    }

    fn check(&self, holder: &dyn std::fmt::Display, referent: ObjectReference) -> bool {
        if self.heap.allocator().is_live(referent) {
            true
        } else {
            error!("{} refers to {}, which is not a live object", holder, referent);
            false
        }
    }

    /// Check the fields of every object. Returns the number of dangling references.
    pub fn verify_heap(&self) -> usize {
        let mut failures = 0;
        let mut objects = 0;
        self.heap
            .allocator()
            .iterate_over_objects(&mut |object, header: &HeapObject| {
                objects += 1;
                for referent in header.references() {
                    if !self.check(&object, referent) {
                        failures += 1;
                    }
                }
            });
        debug!("Verified {} objects, {} failures", objects, failures);
        failures
    }

    /// Check every root: stack, class and strong string table roots. Returns the number of
    /// dangling roots.
    pub fn verify_roots(&self) -> usize {
        let mut failures = 0;
        let mut verify_root = |root: GCRoot| {
            if !self.check(&format_args!("{:?}", root), root.object()) {
                failures += 1;
            }
        };
        VM::VMScanning::visit_roots(&mut verify_root);
        VM::VMScanning::visit_class_roots(&mut verify_root, VisitGCRootFlags::ACCESS_ROOT_ALL);
        VM::VMStringTable::visit_roots(&mut verify_root, VisitGCRootFlags::ACCESS_ROOT_ALL);
        failures
    }

    pub fn verify_all(&self) -> usize {
        self.verify_heap() + self.verify_roots()
    }
}

/// Suspend every mutator, wait until no collection is running, and verify the heap.
/// `caller` is the requesting mutator, if the request comes from one.
pub fn verify_all_paused<VM: VMBinding>(heap: &HeapManager<VM>, caller: Option<MutatorId>) -> usize {
    let mut guard = heap.rendezvous().safepoint_begin(caller);
    wait_for_idle(heap, &mut guard);
    let failures = HeapVerifier::new(heap).verify_all();
    heap.state().end_gc();
    drop(guard);
    if failures > 0 {
        warn!("Heap verification found {} failures", failures);
    } else {
        info!("Heap verification passed");
    }
    failures
}
