// Mock tests can be placed anywhere in the source directory `src`.
// * They need to be compiled with `cfg(test)` or the feature `mock_test`. Otherwise they cannot access `MockVM`.
// * They should have the prefix 'mock_test_' in their file name so they are easy to find and run as a group.

// Common includes for mock tests.
pub(crate) mod mock_test_prelude {
    pub use crate::memory_manager;
    pub use crate::plan::gc_task::GCTaskCause;
    pub use crate::util::options::GcType;
    pub use crate::util::test_util::fixtures::*;
    pub use crate::util::test_util::mock_method::*;
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::ObjectReference;
    pub use crate::vm::*;
}

mod mock_test_allocate;
mod mock_test_back_to_back_requests;
mod mock_test_gc;
mod mock_test_heap_verifier;
mod mock_test_monitors;
mod mock_test_random_graph;
mod mock_test_safepoint;
mod mock_test_startup_and_fork;
mod mock_test_string_table;
mod mock_test_young_promotion;
