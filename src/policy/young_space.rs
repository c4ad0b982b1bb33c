use crate::policy::space::{ObjectEntry, ObjectMap, Space};
use crate::util::address::MemRange;
use crate::util::heap_object::HeapObject;
use crate::util::{Address, ObjectReference};

use std::sync::{Arc, Mutex, MutexGuard};

struct YoungState {
    cursor: Address,
    objects: ObjectMap,
}

/// The young generation: a bump-pointer space that is emptied as a whole after every young
/// collection. Survivors are copied out to the tenured space before the reset.
pub struct YoungSpace {
    range: MemRange,
    state: Mutex<YoungState>,
}

impl YoungSpace {
    pub fn new(range: MemRange) -> Self {
        debug!("Create young space {:?}", range);
        YoungSpace {
            range,
            state: Mutex::new(YoungState {
                cursor: range.start(),
                objects: ObjectMap::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, YoungState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bump-allocate room for `object` and place it there.
    pub fn alloc(&self, object: HeapObject) -> Option<ObjectEntry> {
        let mut state = self.lock();
        let start = state.cursor;
        let end = start + object.size();
        if end > self.range.end() {
            trace!(
                "Young space cannot fit {} bytes: cursor {}, limit {}",
                object.size(),
                start,
                self.range.end()
            );
            return None;
        }
        state.cursor = end;
        Some(state.objects.insert(start, object))
    }

    /// Drop every object and rewind the bump pointer.
    pub fn reset(&self) {
        let mut state = self.lock();
        debug!(
            "Reset young space: {} objects, {} bytes",
            state.objects.len(),
            state.objects.used_bytes()
        );
        state.objects.clear();
        state.cursor = self.range.start();
    }

    pub fn free_bytes(&self) -> usize {
        self.range.end() - self.lock().cursor
    }
}

impl Space for YoungSpace {
    fn get_name(&self) -> &'static str {
        "YoungSpace"
    }

    fn range(&self) -> MemRange {
        self.range
    }

    fn get_object(&self, object: ObjectReference) -> Option<Arc<HeapObject>> {
        self.lock().objects.get(object)
    }

    fn objects(&self) -> Vec<ObjectEntry> {
        self.lock().objects.snapshot()
    }

    fn objects_in_range(&self, range: MemRange) -> Vec<ObjectEntry> {
        self.lock().objects.snapshot_range(range)
    }

    fn used_bytes(&self) -> usize {
        self.lock().objects.used_bytes()
    }

    fn object_count(&self) -> usize {
        self.lock().objects.len()
    }
}
