//! The mark word of an object header, and the forwarding protocol built on it.
//!
//! A mark word is a tagged union. While an object is live in its original location the
//! word holds the mark bit. Once the object has been copied, the word holds the address of
//! the copy, tagged with [`FORWARDED`]. Readers go through [`MarkWord::state`], so following
//! a forwarding pointer is a checked match rather than a reinterpretation of the header.

use crate::util::heap_object::HeapObject;
use crate::util::ObjectReference;
use std::sync::atomic::{AtomicUsize, Ordering};

const MARK_BIT: usize = 0b01;
const FORWARDED: usize = 0b10;
const TAG_MASK: usize = 0b11;

static_assertions::const_assert!(ObjectReference::ALIGNMENT > TAG_MASK);

/// The decoded content of a mark word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderState {
    /// The object lives here. `mark_bit` is the raw bit; whether a set bit means "marked"
    /// depends on the marker's reversed mode.
    Live { mark_bit: bool },
    /// The object has been moved to the given location.
    Forwarded(ObjectReference),
}

#[repr(transparent)]
pub struct MarkWord(AtomicUsize);

impl MarkWord {
    pub const fn new() -> Self {
        MarkWord(AtomicUsize::new(0))
    }

    pub(crate) fn from_raw(raw: usize) -> Self {
        MarkWord(AtomicUsize::new(raw))
    }

    pub(crate) fn raw(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn decode(raw: usize) -> HeaderState {
        if raw & FORWARDED != 0 {
            let to = ObjectReference::decode(raw & !TAG_MASK);
            match to {
                Some(to) => HeaderState::Forwarded(to),
                None => panic!("Corrupted mark word {:#x}: forwarded to null", raw),
            }
        } else {
            HeaderState::Live {
                mark_bit: raw & MARK_BIT != 0,
            }
        }
    }

    pub fn state(&self) -> HeaderState {
        Self::decode(self.raw())
    }

    /// Read the raw mark bit of a live object.
    pub fn mark_bit(&self) -> bool {
        match self.state() {
            HeaderState::Live { mark_bit } => mark_bit,
            HeaderState::Forwarded(to) => {
                panic!("Reading the mark bit of an object forwarded to {}", to)
            }
        }
    }

    /// Set the raw mark bit of a live object.
    pub fn set_mark_bit(&self, value: bool) {
        let old = if value {
            self.0.fetch_or(MARK_BIT, Ordering::AcqRel)
        } else {
            self.0.fetch_and(!MARK_BIT, Ordering::AcqRel)
        };
        debug_assert!(
            old & FORWARDED == 0,
            "Setting the mark bit of a forwarded object (mark word {:#x})",
            old
        );
    }

    /// Atomically flip the raw mark bit to `value`. Returns true if this call made the
    /// transition, false if the bit already had that value.
    pub fn compare_and_set_mark_bit(&self, value: bool) -> bool {
        let mut old = self.raw();
        loop {
            if let HeaderState::Live { mark_bit } = Self::decode(old) {
                if mark_bit == value {
                    return false;
                }
            } else {
                panic!("Marking an object that is already forwarded (mark word {:#x})", old);
            }
            let new = old ^ MARK_BIT;
            match self
                .0
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(current) => old = current,
            }
        }
    }

    fn try_install_forwarding(&self, to: ObjectReference) -> Result<(), ObjectReference> {
        let new = ObjectReference::encode(Some(to)) | FORWARDED;
        let mut old = self.raw();
        loop {
            if let HeaderState::Forwarded(existing) = Self::decode(old) {
                return Err(existing);
            }
            match self
                .0
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(current) => old = current,
            }
        }
    }
}

impl Default for MarkWord {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.state())
    }
}

/// Attempt to install a forwarding pointer. Fails with the existing forwarding address if
/// another mover has already forwarded the object.
pub fn try_forward_object(object: &HeapObject, to: ObjectReference) -> Result<(), ObjectReference> {
    object.mark_word().try_install_forwarding(to)
}

/// Install a forwarding pointer. An object is forwarded at most once per move, so finding
/// an existing forwarding pointer is fatal.
pub fn forward_object(object: &HeapObject, to: ObjectReference) {
    if let Err(existing) = try_forward_object(object, to) {
        panic!(
            "Object is already forwarded to {}, refusing to forward it again to {}",
            existing, to
        );
    }
}

/// Get the new location of a forwarded object.
pub fn get_forwarded_object(object: &HeapObject) -> Option<ObjectReference> {
    match object.mark_word().state() {
        HeaderState::Forwarded(to) => Some(to),
        HeaderState::Live { .. } => None,
    }
}

pub fn is_forwarded(object: &HeapObject) -> bool {
    get_forwarded_object(object).is_some()
}
