//! Heap memory below the spaces: the pools the tenured space is carved from, and the policy
//! that decides when the heap has grown enough to collect.

pub mod gc_trigger;
pub mod pool_manager;

pub use self::gc_trigger::{GCTrigger, GCTriggerPolicy};
pub use self::pool_manager::{Pool, PoolManager};
