use crate::util::heap_object::HeapObject;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of a liveness check during sweeping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectStatus {
    Alive,
    Dead,
}

/// The mark-bit protocol on object headers.
///
/// In reversed mode a clear header bit means "marked". The stop-the-world collector flips
/// the mode after each cycle instead of unmarking every survivor: the survivors of the
/// last cycle, all of which carry the old "marked" value, read as unmarked afterwards.
///
/// `mark_if_not_marked` uses a compare-and-swap while atomic marking is enabled. Phases
/// where only one thread marks can disable it through [`NoAtomicMarkScope`].
pub struct GCMarker {
    reversed: AtomicBool,
    atomic_mark: AtomicBool,
}

impl GCMarker {
    pub fn new() -> Self {
        GCMarker {
            reversed: AtomicBool::new(false),
            atomic_mark: AtomicBool::new(true),
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed.load(Ordering::Relaxed)
    }

    pub fn toggle_reversed(&self) {
        let was = self.reversed.fetch_xor(true, Ordering::AcqRel);
        debug!("Mark bit reversed mode: {} -> {}", was, !was);
    }

    /// The raw header bit value that means "marked" in the current mode.
    fn marked_value(&self) -> bool {
        !self.is_reversed()
    }

    pub fn is_marked(&self, object: &HeapObject) -> bool {
        object.mark_word().mark_bit() == self.marked_value()
    }

    pub fn mark(&self, object: &HeapObject) {
        object.mark_word().set_mark_bit(self.marked_value());
    }

    pub fn un_mark(&self, object: &HeapObject) {
        object.mark_word().set_mark_bit(!self.marked_value());
    }

    /// Mark the object. Returns true if this call marked it, so that every object is pushed
    /// to a mark stack exactly once.
    pub fn mark_if_not_marked(&self, object: &HeapObject) -> bool {
        if self.atomic_mark.load(Ordering::Relaxed) {
            object
                .mark_word()
                .compare_and_set_mark_bit(self.marked_value())
        } else if self.is_marked(object) {
            false
        } else {
            self.mark(object);
            true
        }
    }

    /// Liveness of an object at sweep time. An object without a class is still being
    /// initialized by the thread that allocated it and must survive.
    pub fn mark_checker(&self, object: &HeapObject) -> ObjectStatus {
        if object.class().is_none() || self.is_marked(object) {
            ObjectStatus::Alive
        } else {
            ObjectStatus::Dead
        }
    }

    pub fn is_atomic_mark_enabled(&self) -> bool {
        self.atomic_mark.load(Ordering::Relaxed)
    }

    /// Disable atomic marking until the returned scope is dropped.
    pub fn no_atomic_scope(&self) -> NoAtomicMarkScope<'_> {
        let old = self.atomic_mark.swap(false, Ordering::Relaxed);
        NoAtomicMarkScope { marker: self, old }
    }
}

impl Default for GCMarker {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NoAtomicMarkScope<'a> {
    marker: &'a GCMarker,
    old: bool,
}

impl Drop for NoAtomicMarkScope<'_> {
    fn drop(&mut self) {
        self.marker.atomic_mark.store(self.old, Ordering::Relaxed);
    }
}
