use crate::util::address::MemRange;
use crate::util::heap_object::HeapObject;
use crate::util::object_forwarding;
use crate::util::{Address, ObjectReference};

use std::collections::BTreeMap;
use std::sync::Arc;

/// An object and its location, as handed to heap visitors.
pub type ObjectEntry = (ObjectReference, Arc<HeapObject>);

/// What a sweep of a space reclaimed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub freed_objects: usize,
    pub freed_bytes: usize,
}

impl std::ops::AddAssign for CollectStats {
    fn add_assign(&mut self, other: CollectStats) {
        self.freed_objects += other.freed_objects;
        self.freed_bytes += other.freed_bytes;
    }
}

/// A region of the heap that owns the objects allocated in it.
pub trait Space: Send + Sync {
    fn get_name(&self) -> &'static str;

    /// The address range reserved for this space.
    fn range(&self) -> MemRange;

    fn address_in_space(&self, addr: Address) -> bool {
        self.range().contains_address(addr)
    }

    fn in_space(&self, object: ObjectReference) -> bool {
        self.address_in_space(object.to_raw_address())
    }

    fn get_object(&self, object: ObjectReference) -> Option<Arc<HeapObject>>;

    /// Is `object` an object of this space that has not been moved away?
    fn is_live(&self, object: ObjectReference) -> bool {
        self.get_object(object)
            .is_some_and(|o| !object_forwarding::is_forwarded(&o))
    }

    /// A snapshot of the objects in this space, in address order. Visitors work on the
    /// snapshot so they can call back into the space.
    fn objects(&self) -> Vec<ObjectEntry>;

    /// A snapshot of the objects that start inside `range`.
    fn objects_in_range(&self, range: MemRange) -> Vec<ObjectEntry>;

    /// Bytes occupied by the objects of this space.
    fn used_bytes(&self) -> usize;

    fn object_count(&self) -> usize;
}

/// Objects of a space indexed by address.
#[derive(Default)]
pub(crate) struct ObjectMap {
    objects: BTreeMap<Address, Arc<HeapObject>>,
    used_bytes: usize,
}

impl ObjectMap {
    pub fn insert(&mut self, addr: Address, object: HeapObject) -> ObjectEntry {
        let reference = match addr.to_object_reference() {
            Some(r) => r,
            None => panic!("Placing an object at the null address"),
        };
        self.used_bytes += object.size();
        let object = Arc::new(object);
        let old = self.objects.insert(addr, object.clone());
        assert!(old.is_none(), "Two objects placed at {}", addr);
        (reference, object)
    }

    pub fn remove(&mut self, addr: Address) -> Option<Arc<HeapObject>> {
        let object = self.objects.remove(&addr)?;
        self.used_bytes -= object.size();
        Some(object)
    }

    pub fn get(&self, object: ObjectReference) -> Option<Arc<HeapObject>> {
        self.objects.get(&object.to_raw_address()).cloned()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.used_bytes = 0;
    }

    pub fn snapshot(&self) -> Vec<ObjectEntry> {
        self.entries(self.objects.iter())
    }

    pub fn snapshot_range(&self, range: MemRange) -> Vec<ObjectEntry> {
        if range.is_empty() {
            return vec![];
        }
        self.entries(self.objects.range(range.as_range()))
    }

    fn entries<'a>(
        &self,
        iter: impl Iterator<Item = (&'a Address, &'a Arc<HeapObject>)>,
    ) -> Vec<ObjectEntry> {
        iter.filter_map(|(addr, o)| addr.to_object_reference().map(|r| (r, o.clone())))
            .collect()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}
