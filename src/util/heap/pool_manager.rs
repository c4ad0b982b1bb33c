use crate::util::address::MemRange;
use crate::util::conversions;
use crate::util::Address;

use spin::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed-size piece of the tenured heap handed out by the [`PoolManager`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pool {
    index: usize,
    range: MemRange,
}

impl Pool {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> MemRange {
        self.range
    }

    pub fn start(&self) -> Address {
        self.range.start()
    }

    pub fn size(&self) -> usize {
        self.range.size()
    }
}

/// Hands out pools from a contiguous address range. Pools are returned whole; the manager
/// knows nothing about the objects inside them.
pub struct PoolManager {
    range: MemRange,
    pool_size: usize,
    /// Indices of free pools. The lowest index is at the end so it is reused first.
    free: Mutex<Vec<usize>>,
    pools_in_use: AtomicUsize,
}

impl PoolManager {
    pub fn new(range: MemRange, pool_size: usize) -> Self {
        assert!(pool_size.is_power_of_two(), "Pool size {} is not a power of two", pool_size);
        assert!(
            range.start().is_aligned_to(pool_size),
            "Pool range {:?} is not aligned to the pool size",
            range
        );
        let count = range.size() / pool_size;
        debug!(
            "Create pool manager over {:?}: {} pools of {}",
            range,
            count,
            conversions::bytes_to_formatted_string(pool_size)
        );
        PoolManager {
            range,
            pool_size,
            free: Mutex::new((0..count).rev().collect()),
            pools_in_use: AtomicUsize::new(0),
        }
    }

    pub fn range(&self) -> MemRange {
        self.range
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn total_pools(&self) -> usize {
        self.range.size() / self.pool_size
    }

    pub fn pools_in_use(&self) -> usize {
        self.pools_in_use.load(Ordering::Relaxed)
    }

    pub fn free_pools(&self) -> usize {
        self.free.lock().len()
    }

    fn pool(&self, index: usize) -> Pool {
        Pool {
            index,
            range: MemRange::from_start_and_size(
                self.range.start() + index * self.pool_size,
                self.pool_size,
            ),
        }
    }

    /// The pool that contains `addr`.
    pub fn pool_containing(&self, addr: Address) -> Pool {
        assert!(
            self.range.contains_address(addr),
            "{} is not managed by the pool manager",
            addr
        );
        self.pool((addr - self.range.start()) / self.pool_size)
    }

    pub fn alloc_pool(&self) -> Option<Pool> {
        let index = self.free.lock().pop()?;
        self.pools_in_use.fetch_add(1, Ordering::Relaxed);
        let pool = self.pool(index);
        trace!("Allocate pool {:?}", pool);
        Some(pool)
    }

    pub fn free_pool(&self, pool: Pool) {
        trace!("Free pool {:?}", pool);
        let mut free = self.free.lock();
        debug_assert!(!free.contains(&pool.index), "Double free of {:?}", pool);
        free.push(pool.index);
        self.pools_in_use.fetch_sub(1, Ordering::Relaxed);
    }
}
