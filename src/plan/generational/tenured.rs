//! The tenured collection: a snapshot-at-the-beginning mark that runs mostly concurrently
//! with mutators, followed by a concurrent sweep.

use super::global::GenGC;
use crate::heap_manager::HeapManager;
use crate::plan::gc_task::GCTask;
use crate::plan::phase::{GCPhase, GCScopedPhase};
use crate::plan::tracing::MarkStack;
use crate::util::alloc::CollectMode;
use crate::util::card_table::CardVisitFlags;
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::rendezvous::SafepointGuard;
use crate::util::ObjectReference;
use crate::vm::*;

use std::time::Instant;

/// Marking in the tenured cycle traces through every object, young ones included.
fn any_object(_: ObjectReference) -> bool {
    true
}

impl<VM: VMBinding> GenGC<VM> {
    pub(super) fn run_tenured_gc(
        &self,
        heap: &HeapManager<VM>,
        task: &GCTask,
        guard: &mut SafepointGuard,
    ) {
        debug!("GenGC tenured start");
        let allocator = heap.allocator();
        // Young marking does not filter out tenured objects, so start from a clean slate.
        allocator.iterate_over_objects(&mut |_, header: &HeapObject| self.marker.un_mark(header));

        let mut stack = MarkStack::new(heap, &self.marker);
        self.initial_mark(heap, &mut stack);
        self.concurrent_mark(heap, &mut stack, guard);
        self.remark(heap, &mut stack, task);
        debug_assert!(stack.is_empty());
        drop(stack);

        allocator.iterate_over_young_objects(&mut |_, header: &HeapObject| self.marker.un_mark(header));
        self.sweep_string_table(heap);
        self.sweep(heap, guard);
        // Objects allocated during the sweep are born marked.
        allocator.iterate_over_tenured_objects(&mut |_, header: &HeapObject| {
            self.marker.un_mark(header)
        });
        debug!("GenGC tenured end");
    }

    fn mark_root(stack: &mut MarkStack<VM>, root: GCRoot) {
        trace!("Handle root {:?}", root);
        // A root marked in an earlier step may have had fields written since, so it is
        // always rescanned.
        stack.mark_and_force_push(root.object());
    }

    fn initial_mark(&self, heap: &HeapManager<VM>, stack: &mut MarkStack<VM>) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::InitialMark);
        let _no_atomic = self.marker.no_atomic_scope();
        let recording = VisitGCRootFlags::ACCESS_ROOT_NONE | VisitGCRootFlags::START_RECORDING_NEW_ROOT;
        let mut mark_root = |root: GCRoot| Self::mark_root(stack, root);
        VM::VMScanning::visit_roots(&mut mark_root);
        VM::VMScanning::visit_class_roots(&mut mark_root, recording);
        VM::VMStringTable::visit_roots(&mut mark_root, recording);
        self.set_concurrent_marking(true);
    }

    fn concurrent_mark(
        &self,
        heap: &HeapManager<VM>,
        stack: &mut MarkStack<VM>,
        guard: &mut SafepointGuard,
    ) {
        let options = heap.options();
        let scope = guard.concurrent_scope(options.concurrency_enabled);
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::Mark);
        let start = Instant::now();
        let allocator = heap.allocator();
        let young = Self::young_range(heap);

        stack.drain(any_object);
        let flags = VisitGCRootFlags::ACCESS_ROOT_ALL | VisitGCRootFlags::START_RECORDING_NEW_ROOT;
        VM::VMScanning::visit_class_roots(&mut |root: GCRoot| stack.mark_and_push(root.object()), flags);
        stack.drain(any_object);
        VM::VMStringTable::visit_roots(&mut |root: GCRoot| stack.mark_and_push(root.object()), flags);
        stack.drain(any_object);

        // Marked tenured objects may have had references stored into them since they were
        // scanned. Cards are flagged as processed so that the young collection still sees them.
        self.card_table.visit_marked(
            |range| {
                if range.is_intersect(&young) {
                    return;
                }
                allocator.iterate_over_objects_in_range(range, &mut |_, header: &HeapObject| {
                    if !self.marker.is_marked(header) {
                        return;
                    }
                    for child in header.references().filter(|r| !young.contains_object(*r)) {
                        stack.mark_and_force_push(child);
                    }
                });
            },
            CardVisitFlags::VISIT_MARKED
                | CardVisitFlags::VISIT_PROCESSED
                | CardVisitFlags::SET_PROCESSED,
        );
        stack.drain(any_object);
        if scope.is_started() {
            heap.stats().record_concurrent(start.elapsed());
        }
    }

    fn remark(&self, heap: &HeapManager<VM>, stack: &mut MarkStack<VM>, task: &GCTask) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::Remark);
        let _no_atomic = self.marker.no_atomic_scope();
        let allocator = heap.allocator();
        let young = Self::young_range(heap);

        let new_roots = VisitGCRootFlags::ACCESS_ROOT_ONLY_NEW | VisitGCRootFlags::END_RECORDING_NEW_ROOT;
        {
            let mut mark_root = |root: GCRoot| Self::mark_root(stack, root);
            VM::VMScanning::visit_roots(&mut mark_root);
            VM::VMScanning::visit_class_roots(&mut mark_root, new_roots);
        }
        stack.drain(any_object);

        self.card_table.visit_marked(
            |range| {
                allocator.iterate_over_objects_in_range(range, &mut |object, header: &HeapObject| {
                    if !young.contains_object(object) && !self.marker.is_marked(header) {
                        return;
                    }
                    for child in header.references().filter(|r| !young.contains_object(*r)) {
                        stack.mark_and_force_push(child);
                    }
                });
            },
            CardVisitFlags::VISIT_MARKED,
        );
        stack.drain(any_object);

        VM::VMStringTable::visit_roots(&mut |root: GCRoot| stack.mark_and_push(root.object()), new_roots);
        stack.drain(any_object);

        let mut logged = 0;
        while let Some(object) = self.satb.pop() {
            logged += 1;
            stack.mark_and_push(object);
        }
        trace!("Drained {} SATB entries", logged);
        stack.drain(any_object);

        VM::VMCollection::handle_references(task);
        VM::VMCollection::handle_buffer_data(false);
        self.set_concurrent_marking(false);
        debug!("Marking done, scanned {} objects", stack.scanned());
    }

    fn sweep_string_table(&self, heap: &HeapManager<VM>) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::SweepStringTable);
        let allocator = heap.allocator();
        // Strings interned during the tenured cycle may live in the young space.
        let removed = VM::VMStringTable::sweep(&mut |object| {
            if allocator.is_object_in_young_space(object) {
                return ObjectStatus::Alive;
            }
            match allocator.get_object(object) {
                Some(header) => self.marker.mark_checker(&header),
                None => ObjectStatus::Dead,
            }
        });
        debug!("Removed {} string table entries", removed);
    }

    fn sweep(&self, heap: &HeapManager<VM>, guard: &mut SafepointGuard) {
        let mut scope = guard.concurrent_scope(false);
        let freed = {
            let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::Sweep);
            // The phase is published before mutators resume, so tenured objects they allocate
            // from now on are born marked.
            if heap.options().concurrency_enabled {
                scope.start();
            }
            let start = Instant::now();
            let allocator = heap.allocator();

            // Monitors of dead objects go first, so that no monitor outlives its object.
            let deflated = VM::VMMonitorPool::deflate_monitors_with(&mut |object| {
                match allocator.get_object(object) {
                    None => true,
                    Some(header) => {
                        !allocator.is_object_in_young_space(object)
                            && self.marker.mark_checker(&header) == ObjectStatus::Dead
                    }
                }
            });
            trace!("Deflated {} monitors of dead objects", deflated);

            let freed = allocator.collect(
                &mut |header: &HeapObject| self.marker.mark_checker(header),
                CollectMode::Tenured,
            );
            let pools = allocator.visit_and_remove_free_pools(&mut |range| {
                self.card_table.clear_card_range(range);
            });
            debug!(
                "Swept {} tenured objects ({} bytes), returned {} pools",
                freed.freed_objects, freed.freed_bytes, pools
            );
            if scope.is_started() {
                heap.stats().record_concurrent(start.elapsed());
            }
            freed
        };
        drop(scope);
        heap.stats()
            .record_tenured(freed.freed_objects, freed.freed_bytes);
    }
}
