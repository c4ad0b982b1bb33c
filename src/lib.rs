//! GenGC is the memory manager core of a managed language runtime. It contains a
//! generational collector and a non-generational fallback:
//! * [GenGC](plan/generational/struct.GenGC.html): Young objects are copied into the tenured
//!   space at every collection. The tenured space is marked mostly concurrently with
//!   mutators, using a snapshot-at-the-beginning barrier and a card table, and then swept.
//! * [StwGC](plan/stw/struct.StwGC.html): A stop-the-world mark and sweep collector with a
//!   single space and no write barrier. The meaning of the mark bit flips after every cycle.
//!
//! Mutator threads and collections are coordinated by a safepoint
//! [rendezvous](util/rendezvous/index.html): a collection only changes the heap once every
//! mutator is parked, and concurrent phases hand the heap back to mutators in between.
//!
//! A VM uses the collector through the [`HeapManager`](heap_manager/struct.HeapManager.html)
//! it gets from [`memory_manager::gc_init`](memory_manager/fn.gc_init.html), and implements
//! the traits in [`vm`](vm/index.html) so that the collector can find roots, sweep the
//! string table and deflate monitors.

extern crate static_assertions;

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub(crate) mod global_state;
pub use crate::global_state::GlobalState;

pub mod heap_manager;
pub use crate::heap_manager::HeapManager;

pub mod memory_manager;

pub mod plan;
pub use crate::plan::{GCTaskCause, Mutator};

pub mod policy;
pub mod util;
pub mod vm;
