use crate::policy::space::{CollectStats, ObjectEntry};
use crate::util::address::MemRange;
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::{Address, ObjectReference};

use std::sync::Arc;

/// Which objects [`ObjectAllocator::collect`] sweeps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollectMode {
    /// Only tenured objects.
    Tenured,
    /// Every object in the heap.
    All,
}

/// Called for every object during a heap walk.
pub type ObjectVisitor<'a> = &'a mut dyn FnMut(ObjectReference, &HeapObject);

/// The heap storage seen by the collectors. Collectors never allocate raw memory
/// themselves; every object they create or free goes through this interface.
pub trait ObjectAllocator: Send + Sync {
    /// Allocate an object. Small objects go to the young space if there is one.
    fn allocate(&self, object: HeapObject) -> Option<ObjectEntry>;

    /// Allocate an object that will never move.
    fn allocate_tenured(&self, object: HeapObject) -> Option<ObjectEntry>;

    fn get_object(&self, object: ObjectReference) -> Option<Arc<HeapObject>>;

    fn iterate_over_young_objects(&self, visitor: ObjectVisitor);

    fn iterate_over_tenured_objects(&self, visitor: ObjectVisitor);

    fn iterate_over_objects(&self, visitor: ObjectVisitor) {
        self.iterate_over_young_objects(visitor);
        self.iterate_over_tenured_objects(visitor);
    }

    /// Visit the objects that start inside `range`.
    fn iterate_over_objects_in_range(&self, range: MemRange, visitor: ObjectVisitor);

    /// Free every object of the selected spaces for which `predicate` reports dead.
    fn collect(
        &self,
        predicate: &mut dyn FnMut(&HeapObject) -> ObjectStatus,
        mode: CollectMode,
    ) -> CollectStats;

    /// Drop the young generation wholesale.
    fn reset_young_allocator(&self);

    /// Return empty pools to the pool manager. `visitor` sees the memory of every pool
    /// before it is returned.
    fn visit_and_remove_free_pools(&self, visitor: &mut dyn FnMut(MemRange)) -> usize;

    fn young_space_range(&self) -> Option<MemRange>;

    fn is_address_in_young_space(&self, addr: Address) -> bool {
        self.young_space_range()
            .is_some_and(|range| range.contains_address(addr))
    }

    fn is_object_in_young_space(&self, object: ObjectReference) -> bool {
        self.is_address_in_young_space(object.to_raw_address())
    }

    /// Bytes the tenured space can still hand out.
    fn tenured_free_bytes(&self) -> usize;

    /// Objects larger than this skip the young space.
    fn young_alloc_max_size(&self) -> usize;

    /// Objects larger than this cannot be allocated at all.
    fn max_object_size(&self) -> usize;

    /// Is `object` an object in the heap that has not been moved away?
    fn is_live(&self, object: ObjectReference) -> bool;

    /// Bytes occupied by objects.
    fn footprint(&self) -> usize;

    fn young_used_bytes(&self) -> usize;

    fn object_count(&self) -> usize;

    /// The address range covered by all spaces.
    fn heap_range(&self) -> MemRange;
}
