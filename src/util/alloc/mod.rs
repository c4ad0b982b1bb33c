//! Object allocation on top of the heap spaces.

pub(crate) mod gen_allocator;
pub use gen_allocator::GenObjectAllocator;

pub(crate) mod non_gen_allocator;
pub use non_gen_allocator::NonGenObjectAllocator;

pub(crate) mod object_allocator;
pub use object_allocator::{CollectMode, ObjectAllocator, ObjectVisitor};

use crate::plan::gc_task::GCTaskCause;

/// The number of collections an allocation may trigger before it gives up.
pub const ALLOC_RETRY: usize = 4;

/// The collections a failing movable allocation asks for. A generational heap starts with
/// young collections and asks for an out-of-memory collection on the attempt before last.
/// Any collection that reclaimed memory starts the count over.
pub(crate) struct AllocRetry {
    attempt: usize,
    generational: bool,
}

impl AllocRetry {
    pub fn new(generational: bool) -> Self {
        AllocRetry {
            attempt: 0,
            generational,
        }
    }

    /// The cause of the next collection, or `None` once the attempts are used up.
    pub fn next_cause(&mut self) -> Option<GCTaskCause> {
        if self.attempt >= ALLOC_RETRY {
            return None;
        }
        self.attempt += 1;
        if self.attempt == ALLOC_RETRY - 1 || !self.generational {
            Some(GCTaskCause::Oom)
        } else {
            Some(GCTaskCause::YoungGc)
        }
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Report what the last collection reclaimed.
    pub fn collected(&mut self, reclaimed_bytes: usize) {
        if reclaimed_bytes > 0 {
            self.attempt = 0;
        }
    }
}

/// Why an allocation failed.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocationError {
    /// The heap is exhausted, even after collecting.
    HeapOutOfMemory,
    /// The object is larger than any object the heap can hold.
    ObjectTooLarge,
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::HeapOutOfMemory => write!(f, "heap out of memory"),
            AllocationError::ObjectTooLarge => write!(f, "object too large"),
        }
    }
}

impl std::error::Error for AllocationError {}
