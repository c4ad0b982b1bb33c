//! The young collection: mark the young objects reachable from roots and from marked cards,
//! copy them into the tenured space, and rewrite every reference to them.

use super::global::GenGC;
use crate::heap_manager::HeapManager;
use crate::plan::gc_task::GCTask;
use crate::plan::phase::{GCPhase, GCScopedPhase};
use crate::plan::tracing::MarkStack;
use crate::util::card_table::CardVisitFlags;
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::object_forwarding::{self, HeaderState};
use crate::util::ObjectReference;
use crate::vm::*;

impl<VM: VMBinding> GenGC<VM> {
    pub(super) fn mark_young(&self, heap: &HeapManager<VM>, task: &GCTask) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::MarkYoung);
        let allocator = heap.allocator();
        let young = Self::young_range(heap);
        let in_young = |object: ObjectReference| young.contains_object(object);
        let mut stack = MarkStack::new(heap, &self.marker);

        {
            let mut mark_young_root = |root: GCRoot| {
                if in_young(root.object()) {
                    stack.mark_and_push(root.object());
                } else {
                    trace!("Skip root for young mark: {:?}", root);
                }
            };
            VM::VMScanning::visit_roots(&mut mark_young_root);
            VM::VMScanning::visit_class_roots(
                &mut mark_young_root,
                VisitGCRootFlags::ACCESS_ROOT_ALL,
            );
            VM::VMStringTable::visit_roots(&mut mark_young_root, VisitGCRootFlags::ACCESS_ROOT_ALL);
        }

        debug!("Marking tenured -> young references from cards");
        let mut cards = 0;
        self.card_table.visit_marked(
            |range| {
                if range.is_intersect(&young) {
                    return;
                }
                cards += 1;
                allocator.iterate_over_objects_in_range(range, &mut |_, header: &HeapObject| {
                    for child in header.references().filter(|r| in_young(*r)) {
                        stack.mark_and_push(child);
                    }
                });
            },
            CardVisitFlags::VISIT_MARKED | CardVisitFlags::VISIT_PROCESSED,
        );
        trace!("Visited {} cards", cards);

        stack.drain(in_young);
        debug_assert!(stack.is_empty());
        debug!("Marked young objects, scanned {}", stack.scanned());
        VM::VMCollection::handle_references(task);
    }

    /// Copy every marked young object into the tenured space. Returns false, and leaves the
    /// young space as it is, if the tenured space might not be able to hold the copies.
    pub(super) fn collect_young_and_move(&self, heap: &HeapManager<VM>, task: &GCTask) -> bool {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::CollectYoungAndMove);
        let allocator = heap.allocator();
        let young = Self::young_range(heap);

        // Tenured pools are not compacted, so the worst case needs twice the young space.
        let need_memory = young.size() * 2;
        let free_bytes = allocator.tenured_free_bytes();
        if need_memory > free_bytes {
            warn!(
                "Cannot move young objects: need {} bytes, tenured has {} free",
                need_memory, free_bytes
            );
            // The requester picks the condition up as a pending out-of-memory error. It is
            // cleared again if its allocation succeeds after all.
            if let Some(caller) = task.caller {
                heap.state().set_pending_oom(caller);
            }
            allocator.iterate_over_young_objects(&mut |_, header: &HeapObject| {
                self.marker.un_mark(header);
            });
            return false;
        }

        let mut moved_objects: Vec<ObjectReference> = vec![];
        let mut moved_bytes = 0;
        let mut freed_objects = 0;
        let mut freed_bytes = 0;
        allocator.iterate_over_young_objects(&mut |object, header: &HeapObject| {
            if !self.marker.is_marked(header) {
                trace!("Young object {} is dead", object);
                freed_objects += 1;
                freed_bytes += header.size();
                return;
            }
            if header.class().is_none() {
                panic!("Live young object {} has no class installed", object);
            }
            let copy = header.copy_for_move();
            self.marker.un_mark(&copy);
            let to = match allocator.allocate_tenured(copy) {
                Some((to, _)) => to,
                None => panic!(
                    "Tenured allocation failed while moving {} despite the free space check",
                    object
                ),
            };
            trace!("Move {} -> {} ({} bytes)", object, to, header.size());
            object_forwarding::forward_object(header, to);
            moved_bytes += header.size();
            moved_objects.push(to);
        });
        debug!(
            "Moved {} young objects ({} bytes), {} dead ({} bytes)",
            moved_objects.len(),
            moved_bytes,
            freed_objects,
            freed_bytes
        );

        self.update_refs_to_moved_objects(heap, &moved_objects);
        self.sweep_string_table_young(heap);
        let deflated = VM::VMMonitorPool::deflate_monitors_with(&mut |object| young.contains_object(object));
        trace!("Deflated {} monitors of young objects", deflated);
        allocator.reset_young_allocator();
        heap.stats()
            .record_young((moved_objects.len(), moved_bytes), (freed_objects, freed_bytes));
        true
    }

    fn update_refs_to_moved_objects(&self, heap: &HeapManager<VM>, moved_objects: &[ObjectReference]) {
        let allocator = heap.allocator();
        let young = Self::young_range(heap);
        let forward = |object: ObjectReference| -> Option<ObjectReference> {
            if !young.contains_object(object) {
                return None;
            }
            match allocator.get_object(object)?.mark_word().state() {
                HeaderState::Forwarded(to) => Some(to),
                HeaderState::Live { .. } => None,
            }
        };

        // Moved objects may refer to each other.
        for object in moved_objects {
            heap.object(*object).update_references(&forward);
        }

        // Tenured objects that refer to young objects have marked cards.
        self.card_table.visit_marked(
            |range| {
                if young.contains_range(&range) {
                    return;
                }
                allocator.iterate_over_objects_in_range(range, &mut |_, header: &HeapObject| {
                    header.update_references(&forward);
                });
            },
            CardVisitFlags::VISIT_MARKED | CardVisitFlags::VISIT_PROCESSED,
        );

        VM::VMScanning::update_roots(&mut |object| forward(object));
        VM::VMStringTable::update_moved(&mut |object| forward(object));
        VM::VMMonitorPool::update_moved(&mut |object| forward(object));
    }

    /// Entries still pointing into the young space after the move refer to dead strings.
    fn sweep_string_table_young(&self, heap: &HeapManager<VM>) {
        let _phase = GCScopedPhase::new(heap.state(), heap.stats(), GCPhase::SweepStringTableYoung);
        let young = Self::young_range(heap);
        let removed = VM::VMStringTable::sweep(&mut |object| {
            if young.contains_object(object) {
                ObjectStatus::Dead
            } else {
                ObjectStatus::Alive
            }
        });
        trace!("Removed {} young string table entries", removed);
    }
}
