use crate::policy::space::{CollectStats, ObjectEntry, ObjectMap, Space};
use crate::util::address::MemRange;
use crate::util::heap::pool_manager::{Pool, PoolManager};
use crate::util::heap_object::HeapObject;
use crate::util::marker::ObjectStatus;
use crate::util::{Address, ObjectReference};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct PoolInfo {
    pool: Pool,
    live_objects: usize,
}

struct TenuredState {
    /// The pool new objects are bump-allocated into, and its cursor.
    current: Option<(Pool, Address)>,
    /// Every pool owned by this space, by pool index.
    pools: BTreeMap<usize, PoolInfo>,
    objects: ObjectMap,
}

impl TenuredState {
    fn current_tail(&self) -> usize {
        self.current
            .map_or(0, |(pool, cursor)| pool.range().end() - cursor)
    }
}

/// The tenured generation. Memory is taken from the pool manager one pool at a time, and a
/// pool goes back to the manager once every object in it has been swept.
pub struct TenuredSpace {
    pool_manager: Arc<PoolManager>,
    state: Mutex<TenuredState>,
}

impl TenuredSpace {
    pub fn new(pool_manager: Arc<PoolManager>) -> Self {
        debug!("Create tenured space {:?}", pool_manager.range());
        TenuredSpace {
            pool_manager,
            state: Mutex::new(TenuredState {
                current: None,
                pools: BTreeMap::new(),
                objects: ObjectMap::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TenuredState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_manager.pool_size()
    }

    pub fn alloc(&self, object: HeapObject) -> Option<ObjectEntry> {
        let size = object.size();
        if size > self.pool_size() {
            return None;
        }
        let mut state = self.lock();
        let current = state.current;
        let (pool, cursor) = match current {
            Some((pool, cursor)) if pool.range().end() - cursor >= size => (pool, cursor),
            _ => {
                let pool = self.pool_manager.alloc_pool()?;
                state.pools.insert(
                    pool.index(),
                    PoolInfo {
                        pool,
                        live_objects: 0,
                    },
                );
                (pool, pool.start())
            }
        };
        state.current = Some((pool, cursor + size));
        if let Some(info) = state.pools.get_mut(&pool.index()) {
            info.live_objects += 1;
        }
        Some(state.objects.insert(cursor, object))
    }

    /// Free every object for which `predicate` reports [`ObjectStatus::Dead`]. The predicate
    /// runs without the space lock held, so mutators may keep allocating meanwhile.
    pub fn collect(&self, predicate: &mut dyn FnMut(&HeapObject) -> ObjectStatus) -> CollectStats {
        let snapshot = self.lock().objects.snapshot();
        let dead: Vec<ObjectReference> = snapshot
            .into_iter()
            .filter(|(_, object)| predicate(object) == ObjectStatus::Dead)
            .map(|(r, _)| r)
            .collect();

        let mut stats = CollectStats::default();
        let mut state = self.lock();
        for r in dead {
            let addr = r.to_raw_address();
            if let Some(object) = state.objects.remove(addr) {
                trace!("Free tenured object {} ({} bytes)", r, object.size());
                stats.freed_objects += 1;
                stats.freed_bytes += object.size();
                let index = self.pool_manager.pool_containing(addr).index();
                if let Some(info) = state.pools.get_mut(&index) {
                    info.live_objects -= 1;
                }
            }
        }
        stats
    }

    /// Return every pool without objects to the pool manager, calling `visitor` with the
    /// memory of each returned pool. The current allocation pool is kept.
    pub fn visit_and_remove_free_pools(&self, visitor: &mut dyn FnMut(MemRange)) -> usize {
        let mut state = self.lock();
        let current = state.current.map(|(pool, _)| pool.index());
        let empty: Vec<usize> = state
            .pools
            .iter()
            .filter(|(index, info)| info.live_objects == 0 && Some(**index) != current)
            .map(|(index, _)| *index)
            .collect();
        for index in empty.iter() {
            if let Some(info) = state.pools.remove(index) {
                visitor(info.pool.range());
                self.pool_manager.free_pool(info.pool);
            }
        }
        if !empty.is_empty() {
            debug!("Returned {} free pools to the pool manager", empty.len());
        }
        empty.len()
    }

    /// Bytes that can still be allocated: the tail of the current pool plus all free pools.
    pub fn free_bytes(&self) -> usize {
        let tail = self.lock().current_tail();
        tail + self.pool_manager.free_pools() * self.pool_size()
    }

    pub fn pools_count(&self) -> usize {
        self.lock().pools.len()
    }
}

impl Space for TenuredSpace {
    fn get_name(&self) -> &'static str {
        "TenuredSpace"
    }

    fn range(&self) -> MemRange {
        self.pool_manager.range()
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

impl Drop for TenuredSpace {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.current = None;
        state.objects.clear();
        let pools = std::mem::take(&mut state.pools);
        for (_, info) in pools {
            self.pool_manager.free_pool(info.pool);
        }
    }
}
