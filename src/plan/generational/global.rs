use crate::heap_manager::HeapManager;
use crate::plan::barriers::{Barrier, GenBarrier, SatbBuffer};
use crate::plan::gc_task::GCTask;
use crate::plan::global::{should_run_tenured_gc, GarbageCollector};
use crate::plan::phase::GCPhase;
use crate::util::address::MemRange;
use crate::util::card_table::CardTable;
use crate::util::heap_object::HeapObject;
use crate::util::marker::GCMarker;
use crate::util::options::GcType;
use crate::util::rendezvous::SafepointGuard;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct GenGC<VM: VMBinding> {
    pub(super) marker: GCMarker,
    pub(super) card_table: Arc<CardTable>,
    /// Overwritten referents logged by the pre-write barrier during concurrent marking.
    pub(super) satb: Arc<SatbBuffer>,
    /// Read by the pre-write barrier.
    pub(super) concurrent_marking: Arc<AtomicBool>,
    young_gcs_since_major: AtomicUsize,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> GenGC<VM> {
    /// `heap_range` covers the young and the tenured space.
    pub fn new(heap_range: MemRange) -> Self {
        debug!("Create GenGC with a card table over {:?}", heap_range);
        GenGC {
            marker: GCMarker::new(),
            card_table: Arc::new(CardTable::new(heap_range)),
            satb: Arc::new(SatbBuffer::new()),
            concurrent_marking: Arc::new(AtomicBool::new(false)),
            young_gcs_since_major: AtomicUsize::new(0),
            phantom: PhantomData,
        }
    }

    pub fn card_table(&self) -> &CardTable {
        &self.card_table
    }

    pub fn young_gcs_since_major(&self) -> usize {
        self.young_gcs_since_major.load(Ordering::Relaxed)
    }

    pub(super) fn set_concurrent_marking(&self, value: bool) {
        self.concurrent_marking.store(value, Ordering::SeqCst);
    }

    pub(super) fn young_range(heap: &HeapManager<VM>) -> MemRange {
        match heap.allocator().young_space_range() {
            Some(range) => range,
            None => panic!("GenGC runs on an allocator without a young space"),
        }
    }
}

impl<VM: VMBinding> GarbageCollector<VM> for GenGC<VM> {
    fn gc_type(&self) -> GcType {
        GcType::GenGc
    }

    fn is_generational(&self) -> bool {
        true
    }

    fn marker(&self) -> &GCMarker {
        &self.marker
    }

    fn create_barrier(&self) -> Box<dyn Barrier> {
        Box::new(GenBarrier::new(
            self.card_table.clone(),
            self.satb.clone(),
            self.concurrent_marking.clone(),
        ))
    }

    fn init_gc_bits(&self, heap: &HeapManager<VM>, object: ObjectReference, header: &HeapObject) {
        let in_concurrent_phase = |phase: GCPhase| matches!(phase, GCPhase::Mark | GCPhase::Sweep);
        if !heap.allocator().is_object_in_young_space(object) && in_concurrent_phase(heap.state().phase())
        {
            // Tenured objects allocated while marking or sweeping are born marked, so the
            // running cycle keeps them. If the phase ended meanwhile, nobody will unmark it.
            self.marker.mark(header);
            if !in_concurrent_phase(heap.state().phase()) {
                self.marker.un_mark(header);
            }
        } else {
            self.marker.un_mark(header);
        }
        trace!(
            "Init gc bits for {}: marked = {}",
            object,
            self.marker.is_marked(header)
        );
    }

    fn un_mark_object(&self, object: &HeapObject) {
        self.marker.un_mark(object);
    }

    fn is_concurrent_marking(&self) -> bool {
        self.concurrent_marking.load(Ordering::SeqCst)
    }

    fn run_phases_impl(&self, heap: &HeapManager<VM>, task: &GCTask, guard: &mut SafepointGuard) {
        info!("GenGC start");
        debug!("Young range: {:?}", Self::young_range(heap));
        let moved = {
            let _no_atomic = self.marker.no_atomic_scope();
            self.mark_young(heap, task);
            let moved = self.collect_young_and_move(heap, task);
            if moved {
                self.card_table.clear_all();
                self.young_gcs_since_major.fetch_add(1, Ordering::Relaxed);
            }
            moved
        };
        // Young objects that could not be moved need tenured space right away.
        let period_elapsed =
            !moved || self.young_gcs_since_major() > heap.options().major_gc_period;
        if should_run_tenured_gc(heap, task, period_elapsed) {
            self.run_tenured_gc(heap, task, guard);
            self.young_gcs_since_major.store(0, Ordering::Relaxed);
        }
        info!("GenGC end");
    }
}
