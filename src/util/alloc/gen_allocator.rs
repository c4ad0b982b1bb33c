use super::object_allocator::{CollectMode, ObjectAllocator, ObjectVisitor};
use crate::policy::space::{CollectStats, ObjectEntry, Space};
use crate::policy::tenured_space::TenuredSpace;
use crate::policy::young_space::YoungSpace;
use crate::util::address::MemRange;
use crate::util::heap::pool_manager::PoolManager;
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::ObjectReference;

use std::sync::Arc;

/// Storage for the generational collector: a young bump space in front of the tenured
/// pool space.
pub struct GenObjectAllocator {
    young: YoungSpace,
    tenured: TenuredSpace,
    young_alloc_max_size: usize,
}

impl GenObjectAllocator {
    pub fn new(
        young_range: MemRange,
        pool_manager: Arc<PoolManager>,
        young_alloc_max_size: usize,
    ) -> Self {
        assert!(
            young_range.end() <= pool_manager.range().start(),
            "Young space {:?} overlaps tenured space {:?}",
            young_range,
            pool_manager.range()
        );
        GenObjectAllocator {
            young: YoungSpace::new(young_range),
            tenured: TenuredSpace::new(pool_manager),
            young_alloc_max_size,
        }
    }

    fn space_of(&self, object: ObjectReference) -> Option<&dyn Space> {
        if self.young.in_space(object) {
            Some(&self.young)
        } else if self.tenured.in_space(object) {
            Some(&self.tenured)
        } else {
            None
        }
    }
}

fn visit_all(entries: Vec<ObjectEntry>, visitor: ObjectVisitor) {
    for (r, object) in entries {
        visitor(r, &object);
    }
}

impl ObjectAllocator for GenObjectAllocator {
    fn allocate(&self, object: HeapObject) -> Option<ObjectEntry> {
        if object.size() <= self.young_alloc_max_size {
            self.young.alloc(object)
        } else {
            self.tenured.alloc(object)
        }
    }

    fn allocate_tenured(&self, object: HeapObject) -> Option<ObjectEntry> {
        self.tenured.alloc(object)
    }

    fn get_object(&self, object: ObjectReference) -> Option<Arc<HeapObject>> {
        self.space_of(object)?.get_object(object)
    }

    fn iterate_over_young_objects(&self, visitor: ObjectVisitor) {
        visit_all(self.young.objects(), visitor);
    }

    fn iterate_over_tenured_objects(&self, visitor: ObjectVisitor) {
        visit_all(self.tenured.objects(), visitor);
    }

    fn iterate_over_objects_in_range(&self, range: MemRange, visitor: ObjectVisitor) {
        if range.is_intersect(&self.young.range()) {
            visit_all(self.young.objects_in_range(range), visitor);
        }
        if range.is_intersect(&self.tenured.range()) {
            visit_all(self.tenured.objects_in_range(range), visitor);
        }
    }

    fn collect(
        &self,
        predicate: &mut dyn FnMut(&HeapObject) -> ObjectStatus,
        mode: CollectMode,
    ) -> CollectStats {
        match mode {
            CollectMode::Tenured => self.tenured.collect(predicate),
            CollectMode::All => panic!(
                "The young space is never swept; it is evacuated and reset instead"
            ),
        }
    }

    fn reset_young_allocator(&self) {
        self.young.reset();
    }

    fn visit_and_remove_free_pools(&self, visitor: &mut dyn FnMut(MemRange)) -> usize {
        self.tenured.visit_and_remove_free_pools(visitor)
    }

    fn young_space_range(&self) -> Option<MemRange> {
        Some(self.young.range())
    }

    fn tenured_free_bytes(&self) -> usize {
        self.tenured.free_bytes()
    }

    fn young_alloc_max_size(&self) -> usize {
        self.young_alloc_max_size
    }

    fn max_object_size(&self) -> usize {
        self.tenured.pool_size()
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        self.space_of(object).is_some_and(|s| s.is_live(object))
    }

    fn footprint(&self) -> usize {
        self.young.used_bytes() + self.tenured.used_bytes()
    }

    fn young_used_bytes(&self) -> usize {
        self.young.used_bytes()
    }

    fn object_count(&self) -> usize {
        self.young.object_count() + self.tenured.object_count()
    }

    fn heap_range(&self) -> MemRange {
        MemRange::new(self.young.range().start(), self.tenured.range().end())
    }
}
