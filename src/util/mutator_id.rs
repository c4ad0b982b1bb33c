use std::fmt;

/// Identifies a mutator thread known to the collector. The id is handed out when a mutator
/// is bound to a heap, and is what the collector passes back to the VM (e.g. to report an
/// out-of-memory condition on the right thread).
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutatorId(usize);

impl MutatorId {
    pub const fn new(id: usize) -> Self {
        MutatorId(id)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for MutatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutator#{}", self.0)
    }
}

impl fmt::Display for MutatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
