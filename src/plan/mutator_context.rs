use crate::heap_manager::HeapManager;
use crate::util::alloc::AllocationError;
use crate::util::heap_object::ClassId;
use crate::util::rendezvous::NativeScope;
use crate::util::{MutatorId, ObjectReference};
use crate::vm::VMBinding;

use std::sync::Arc;

/// A mutator thread bound to a heap. Every thread that runs managed code holds one, and
/// must call [`Mutator::safepoint_poll`] regularly, or collections stall.
///
/// The mutator is registered with the rendezvous while it lives. Dropping it unbinds the
/// thread.
pub struct Mutator<VM: VMBinding> {
    id: MutatorId,
    heap: Arc<HeapManager<VM>>,
}

impl<VM: VMBinding> Mutator<VM> {
    pub(crate) fn new(heap: Arc<HeapManager<VM>>) -> Self {
        let id = heap.register_mutator();
        debug!("Bind {}", id);
        Mutator { id, heap }
    }

    pub fn id(&self) -> MutatorId {
        self.id
    }

    pub fn heap(&self) -> &Arc<HeapManager<VM>> {
        &self.heap
    }

    /// Allocate a movable object.
    pub fn alloc(
        &self,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
    ) -> Result<ObjectReference, AllocationError> {
        self.safepoint_poll();
        self.heap
            .allocate(self.id, class, num_fields, payload_bytes, true)
    }

    /// Allocate an object in the tenured space. It will never move.
    pub fn alloc_non_movable(
        &self,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
    ) -> Result<ObjectReference, AllocationError> {
        self.safepoint_poll();
        self.heap
            .allocate(self.id, class, num_fields, payload_bytes, false)
    }

    pub fn write_field(&self, src: ObjectReference, index: usize, target: Option<ObjectReference>) {
        self.heap.write_field(src, index, target)
    }

    pub fn read_field(&self, src: ObjectReference, index: usize) -> Option<ObjectReference> {
        self.heap.read_field(src, index)
    }

    /// Park here if a safepoint is requested.
    pub fn safepoint_poll(&self) {
        self.heap.rendezvous().safepoint_poll(self.id)
    }

    /// Leave managed code until the returned scope is dropped. The thread must not touch the
    /// heap meanwhile.
    pub fn native_scope(&self) -> NativeScope<'_> {
        self.heap.rendezvous().enter_native(self.id)
    }
}

impl<VM: VMBinding> Drop for Mutator<VM> {
    fn drop(&mut self) {
        debug!("Unbind {}", self.id);
        self.heap.unregister_mutator(self.id);
    }
}

impl<VM: VMBinding> std::fmt::Debug for Mutator<VM> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mutator({})", self.id)
    }
}
