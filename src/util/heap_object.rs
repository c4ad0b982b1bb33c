use crate::util::constants::*;
use crate::util::conversions::raw_align_up;
use crate::util::object_forwarding::MarkWord;
use crate::util::ObjectReference;

use std::num::NonZeroU32;
use std::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};

/// Identifies the class of an object. The collector only needs to know whether a class
/// has been installed yet; everything else about classes belongs to the VM.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(NonZeroU32);

impl ClassId {
    pub const fn new(id: u32) -> Option<ClassId> {
        match NonZeroU32::new(id) {
            Some(id) => Some(ClassId(id)),
            None => None,
        }
    }

    pub const fn as_u32(self) -> u32 {
        self.0.get()
    }
}

/// A managed object: a header (class word and mark word) plus reference slots. Non-reference
/// payload only contributes to the object size.
///
/// Every header and slot is an atomic, because mutators keep reading and writing objects
/// while the concurrent phases of the collector scan them.
pub struct HeapObject {
    class: AtomicU32,
    mark_word: MarkWord,
    size: usize,
    fields: Box<[AtomicUsize]>,
}

impl HeapObject {
    /// The size in bytes of an object with the given number of reference slots and payload.
    pub const fn size_for(num_fields: usize, payload_bytes: usize) -> usize {
        raw_align_up(
            OBJECT_HEADER_SIZE + num_fields * BYTES_IN_WORD + payload_bytes,
            OBJECT_ALIGNMENT,
        )
    }

    /// A fresh object with no class installed, an unset mark bit and null slots.
    pub fn new(num_fields: usize, payload_bytes: usize) -> HeapObject {
        HeapObject {
            class: AtomicU32::new(0),
            mark_word: MarkWord::new(),
            size: Self::size_for(num_fields, payload_bytes),
            fields: (0..num_fields).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// The installed class, or `None` if the allocating thread has not installed it yet.
    pub fn class(&self) -> Option<ClassId> {
        ClassId::new(self.class.load(Ordering::Acquire))
    }

    /// Install the class word. The fence makes the initialized header visible to every
    /// thread that can subsequently reach the object.
    pub fn install_class(&self, class: ClassId) {
        self.class.store(class.as_u32(), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    pub fn mark_word(&self) -> &MarkWord {
        &self.mark_word
    }

    pub fn load_field(&self, index: usize) -> Option<ObjectReference> {
        ObjectReference::decode(self.fields[index].load(Ordering::Acquire))
    }

    /// Raw store into a reference slot. Mutators must store through the barrier instead.
    pub fn store_field(&self, index: usize, value: Option<ObjectReference>) {
        self.fields[index].store(ObjectReference::encode(value), Ordering::Release);
    }

    /// All non-null references held by this object.
    pub fn references(&self) -> impl Iterator<Item = ObjectReference> + '_ {
        self.fields
            .iter()
            .filter_map(|slot| ObjectReference::decode(slot.load(Ordering::Acquire)))
    }

    /// Rewrite every non-null slot for which `forward` returns a new location.
    pub fn update_references<F>(&self, mut forward: F)
    where
        F: FnMut(ObjectReference) -> Option<ObjectReference>,
    {
        for slot in self.fields.iter() {
            if let Some(old) = ObjectReference::decode(slot.load(Ordering::Acquire)) {
                if let Some(new) = forward(old) {
                    trace!("Update slot {} -> {}", old, new);
                    slot.store(ObjectReference::encode(Some(new)), Ordering::Release);
                }
            }
        }
    }

    /// A bit-for-bit copy of this object, used when moving it to another space.
    pub(crate) fn copy_for_move(&self) -> HeapObject {
        let copy = HeapObject {
            class: AtomicU32::new(self.class.load(Ordering::Acquire)),
            mark_word: MarkWord::from_raw(self.mark_word.raw()),
            size: self.size,
            fields: self
                .fields
                .iter()
                .map(|slot| AtomicUsize::new(slot.load(Ordering::Acquire)))
                .collect(),
        };
        fence(Ordering::SeqCst);
        copy
    }
}

impl std::fmt::Debug for HeapObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapObject")
            .field("class", &self.class())
            .field("mark_word", &self.mark_word)
            .field("size", &self.size)
            .field("fields", &self.num_fields())
            .finish()
    }
}
