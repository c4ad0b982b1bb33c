use crate::util::MutatorId;

use bytemuck::NoUninit;

/// Why a collection was requested. Causes are ordered by priority: a finished collection
/// satisfies every pending request whose cause is not higher than its own.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, NoUninit)]
pub enum GCTaskCause {
    Invalid = 0,
    /// An allocation did not fit into the young space.
    YoungGc,
    /// The runtime is about to fork worker processes from a template process.
    PygoteFork,
    /// Application startup has finished.
    StartupComplete,
    /// Native allocations grew past their threshold.
    NativeAlloc,
    /// The GC trigger decided the heap has grown enough.
    HeapUsageThreshold,
    /// The application asked for a collection.
    Explicit,
    /// An allocation failed even after collecting.
    Oom,
}

/// A request for a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GCTask {
    pub cause: GCTaskCause,
    /// The mutator that asked for the collection, if the request came from one.
    pub caller: Option<MutatorId>,
}

impl GCTask {
    pub fn new(cause: GCTaskCause, caller: Option<MutatorId>) -> Self {
        assert_ne!(cause, GCTaskCause::Invalid, "A collection needs a cause");
        GCTask { cause, caller }
    }

    /// Does a completed collection with cause `completed` satisfy this request?
    pub fn is_satisfied_by(&self, completed: GCTaskCause) -> bool {
        completed >= self.cause
    }
}
