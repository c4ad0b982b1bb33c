use crate::heap_manager::HeapManager;
use crate::plan::barriers::{Barrier, NoBarrier};
use crate::plan::gc_task::GCTask;
use crate::plan::global::GarbageCollector;
use crate::plan::phase::{GCPhase, GCScopedPhase};
use crate::plan::tracing::MarkStack;
use crate::util::alloc::CollectMode;
use crate::util::heap_object::HeapObject;
use crate::util::marker::{GCMarker, ObjectStatus};
use crate::util::options::GcType;
use crate::util::rendezvous::SafepointGuard;
use crate::util::ObjectReference;
use crate::vm::*;

use std::marker::PhantomData;

/// Survivors are never unmarked. The marker flips its reversed mode after every cycle, which
/// turns every mark of the finished cycle into "unmarked" at once.
pub struct StwGC<VM: VMBinding> {
    marker: GCMarker,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> StwGC<VM> {
    pub fn new() -> Self {
        debug!("Create StwGC");
        StwGC {
            marker: GCMarker::new(),
            phantom: PhantomData,
        }
    }

    fn mark(&self, heap: &HeapManager<VM>, task: &GCTask) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::Mark);
        let _no_atomic = self.marker.no_atomic_scope();
        let mut stack = MarkStack::new(heap, &self.marker);
        {
            let mut mark_root = |root: GCRoot| {
                trace!("Handle root {:?}", root);
                stack.mark_and_push(root.object());
            };
            VM::VMScanning::visit_roots(&mut mark_root);
            VM::VMScanning::visit_class_roots(&mut mark_root, VisitGCRootFlags::ACCESS_ROOT_ALL);
            VM::VMStringTable::visit_roots(&mut mark_root, VisitGCRootFlags::ACCESS_ROOT_ALL);
        }
        stack.drain(|_| true);
        debug!("Marking done, scanned {} objects", stack.scanned());

        VM::VMCollection::handle_references(task);
        VM::VMCollection::handle_buffer_data(self.marker.is_reversed());
    }

    fn sweep_string_table(&self, heap: &HeapManager<VM>) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::SweepStringTable);
        let allocator = heap.allocator();
        let removed = VM::VMStringTable::sweep(&mut |object| match allocator.get_object(object) {
            Some(header) => self.marker.mark_checker(&header),
            None => ObjectStatus::Dead,
        });
        debug!("Removed {} string table entries", removed);
    }

    fn sweep(&self, heap: &HeapManager<VM>) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::Sweep);
        let allocator = heap.allocator();
        let deflated = VM::VMMonitorPool::deflate_monitors_with(&mut |object| {
            allocator
                .get_object(object)
                .map_or(true, |header| self.marker.mark_checker(&header) == ObjectStatus::Dead)
        });
        trace!("Deflated {} monitors of dead objects", deflated);

        let freed = allocator.collect(
            &mut |header: &HeapObject| self.marker.mark_checker(header),
            CollectMode::All,
        );
        let pools = allocator.visit_and_remove_free_pools(&mut |range| {
            trace!("Return pool {:?}", range);
        });
        debug!(
            "Swept {} objects ({} bytes), returned {} pools",
            freed.freed_objects, freed.freed_bytes, pools
        );
        heap.stats()
            .record_tenured(freed.freed_objects, freed.freed_bytes);
    }
}

impl<VM: VMBinding> Default for StwGC<VM> {
    fn default() -> Self {
        Self::new()
    }
}

impl<VM: VMBinding> GarbageCollector<VM> for StwGC<VM> {
    fn gc_type(&self) -> GcType {
        GcType::Stw
    }

    fn is_generational(&self) -> bool {
        false
    }

    fn marker(&self) -> &GCMarker {
        &self.marker
    }

    fn create_barrier(&self) -> Box<dyn Barrier> {
        Box::new(NoBarrier)
    }

    fn init_gc_bits(&self, _heap: &HeapManager<VM>, object: ObjectReference, header: &HeapObject) {
        // Allocation only happens outside the safepoint, where nothing is marked.
        self.marker.un_mark(header);
        trace!("Init gc bits for {}", object);
    }

    fn un_mark_object(&self, _object: &HeapObject) {
        panic!("StwGC never unmarks single objects, it reverses the mark bit instead");
    }

    fn run_phases_impl(&self, heap: &HeapManager<VM>, task: &GCTask, _guard: &mut SafepointGuard) {
        info!("StwGC start");
        self.mark(heap, task);
        self.sweep_string_table(heap);
        self.sweep(heap);
        self.marker.toggle_reversed();
        info!("StwGC end");
    }
}
