use super::object_allocator::{CollectMode, ObjectAllocator, ObjectVisitor};
use crate::policy::space::{CollectStats, ObjectEntry, Space};
use crate::policy::tenured_space::TenuredSpace;
use crate::util::address::MemRange;
use crate::util::heap::pool_manager::PoolManager;
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::ObjectReference;

use std::sync::Arc;

/// Storage for the stop-the-world collector: every object lives in the pool space.
pub struct NonGenObjectAllocator {
    space: TenuredSpace,
}

impl NonGenObjectAllocator {
    pub fn new(pool_manager: Arc<PoolManager>) -> Self {
        NonGenObjectAllocator {
            space: TenuredSpace::new(pool_manager),
        }
    }
}

impl ObjectAllocator for NonGenObjectAllocator {
    fn allocate(&self, object: HeapObject) -> Option<ObjectEntry> {
        self.space.alloc(object)
    }

    fn allocate_tenured(&self, object: HeapObject) -> Option<ObjectEntry> {
        self.space.alloc(object)
    }

    fn get_object(&self, object: ObjectReference) -> Option<Arc<HeapObject>> {
        if self.space.in_space(object) {
            self.space.get_object(object)
        } else {
            None
        }
    }

    fn iterate_over_young_objects(&self, _visitor: ObjectVisitor) {}

    fn iterate_over_tenured_objects(&self, visitor: ObjectVisitor) {
        for (r, object) in self.space.objects() {
            visitor(r, &object);
        }
    }

    fn iterate_over_objects_in_range(&self, range: MemRange, visitor: ObjectVisitor) {
        for (r, object) in self.space.objects_in_range(range) {
            visitor(r, &object);
        }
    }

    fn collect(
        &self,
        predicate: &mut dyn FnMut(&HeapObject) -> ObjectStatus,
        _mode: CollectMode,
    ) -> CollectStats {
        self.space.collect(predicate)
    }

    fn reset_young_allocator(&self) {}

    fn visit_and_remove_free_pools(&self, visitor: &mut dyn FnMut(MemRange)) -> usize {
        self.space.visit_and_remove_free_pools(visitor)
    }

    fn young_space_range(&self) -> Option<MemRange> {
        None
    }

    fn tenured_free_bytes(&self) -> usize {
        self.space.free_bytes()
    }

    fn young_alloc_max_size(&self) -> usize {
        0
    }

    fn max_object_size(&self) -> usize {
        self.space.pool_size()
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        self.space.in_space(object) && self.space.is_live(object)
    }

    fn footprint(&self) -> usize {
        self.space.used_bytes()
    }

    fn young_used_bytes(&self) -> usize {
        0
    }

    fn object_count(&self) -> usize {
        self.space.object_count()
    }

    fn heap_range(&self) -> MemRange {
        self.space.range()
    }
}
