//! Write barriers.
//!
//! Mutators store references through [`Barrier::object_reference_write`]. The generational
//! barrier keeps two invariants: the card of every object that receives a reference is
//! marked, so a young collection finds tenured-to-young references without a heap scan, and
//! while concurrent marking is active the overwritten referent is logged, so no object
//! reachable at the start of marking becomes unreachable without being seen.

use crate::util::card_table::CardTable;
use crate::util::heap_object::HeapObject;
use crate::util::ObjectReference;

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The snapshot-at-the-beginning log, filled by the pre-write barrier and drained at remark.
pub type SatbBuffer = SegQueue<ObjectReference>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BarrierSelector {
    NoBarrier,
    GenBarrier,
}

pub trait Barrier: 'static + Send + Sync {
    fn selector(&self) -> BarrierSelector;

    /// Called before a reference store. `old` is the value being overwritten.
    fn object_reference_write_pre(
        &self,
        src: ObjectReference,
        old: Option<ObjectReference>,
        target: Option<ObjectReference>,
    );

    /// Called after a reference store.
    fn object_reference_write_post(&self, src: ObjectReference, target: Option<ObjectReference>);

    /// Store `target` into slot `index` of `object`, which lives at `src`.
    fn object_reference_write(
        &self,
        src: ObjectReference,
        object: &HeapObject,
        index: usize,
        target: Option<ObjectReference>,
    ) {
        let old = object.load_field(index);
        self.object_reference_write_pre(src, old, target);
        object.store_field(index, target);
        self.object_reference_write_post(src, target);
    }
}

/// For collectors that stop the world for the whole cycle and never scan cards.
pub struct NoBarrier;

impl Barrier for NoBarrier {
    fn selector(&self) -> BarrierSelector {
        BarrierSelector::NoBarrier
    }

    fn object_reference_write_pre(
        &self,
        _src: ObjectReference,
        _old: Option<ObjectReference>,
        _target: Option<ObjectReference>,
    ) {
    }

    fn object_reference_write_post(&self, _src: ObjectReference, _target: Option<ObjectReference>) {}
}

/// Card marking plus a SATB pre-barrier while concurrent marking is active.
pub struct GenBarrier {
    card_table: Arc<CardTable>,
    satb: Arc<SatbBuffer>,
    concurrent_marking: Arc<AtomicBool>,
}

impl GenBarrier {
    pub fn new(
        card_table: Arc<CardTable>,
        satb: Arc<SatbBuffer>,
        concurrent_marking: Arc<AtomicBool>,
    ) -> Self {
        GenBarrier {
            card_table,
            satb,
            concurrent_marking,
        }
    }
}

impl Barrier for GenBarrier {
    fn selector(&self) -> BarrierSelector {
        BarrierSelector::GenBarrier
    }

    fn object_reference_write_pre(
        &self,
        _src: ObjectReference,
        old: Option<ObjectReference>,
        _target: Option<ObjectReference>,
    ) {
        if !self.concurrent_marking.load(Ordering::Acquire) {
            return;
        }
        if let Some(old) = old {
            trace!("SATB log {}", old);
            self.satb.push(old);
        }
    }

    fn object_reference_write_post(&self, src: ObjectReference, target: Option<ObjectReference>) {
        if target.is_some() {
            self.card_table.mark_card(src.to_raw_address());
        }
    }
}
