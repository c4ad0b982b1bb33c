//! The collectors.
//!
//! A collector is a phase sequence behind the [`GarbageCollector`] trait. The set of
//! collectors is closed: [`Collector`] is an enum over the generational collector and the
//! stop-the-world collector, selected by [`Options::gc_type`](crate::util::options::Options).
//! Both share the request protocol in [`global`]: a collection request is a [`GCTask`], it
//! runs under a safepoint, and a request already covered by a collection that finished
//! meanwhile does not run again.

pub mod barriers;
pub mod gc_task;
pub mod global;
pub mod mutator_context;
pub mod phase;
pub(crate) mod tracing;

pub mod generational;
pub mod stw;

pub use self::barriers::{Barrier, BarrierSelector};
pub use self::gc_task::{GCTask, GCTaskCause};
pub use self::global::{Collector, GarbageCollector};
pub use self::mutator_context::Mutator;
pub use self::phase::GCPhase;
