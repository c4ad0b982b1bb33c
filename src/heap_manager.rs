//! The heap context. A [`HeapManager`] owns every piece of collector state: the spaces, the
//! collector, the rendezvous and the bookkeeping around them. It is passed explicitly to
//! every entry point; there is no process-wide instance.

use crate::global_state::GlobalState;
use crate::plan::barriers::Barrier;
use crate::plan::gc_task::{GCTask, GCTaskCause};
use crate::plan::global::{wait_for_gc, Collector, GarbageCollector};
use crate::util::address::MemRange;
use crate::util::alloc::{
    AllocRetry, AllocationError, GenObjectAllocator, NonGenObjectAllocator, ObjectAllocator,
};
use crate::util::constants::HEAP_START;
use crate::util::conversions::bytes_to_formatted_string;
use crate::util::heap::gc_trigger::GCTrigger;
use crate::util::heap::pool_manager::PoolManager;
use crate::util::heap_object::{ClassId, HeapObject};
use crate::util::notification::NotificationManager;
use crate::util::options::Options;
use crate::util::rendezvous::Rendezvous;
use crate::util::statistics::GcStats;
use crate::util::{Address, MutatorId, ObjectReference};
use crate::vm::{Collection, VMBinding};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct HeapManager<VM: VMBinding> {
    options: Options,
    state: GlobalState,
    stats: GcStats,
    rendezvous: Rendezvous,
    notifications: NotificationManager,
    trigger: GCTrigger,
    allocator: Box<dyn ObjectAllocator>,
    collector: Collector<VM>,
    barrier: Box<dyn Barrier>,
    next_mutator_id: AtomicUsize,
}

impl<VM: VMBinding> HeapManager<VM> {
    /// Lay out the spaces and create the collector selected by `options`.
    ///
    /// The generational heap puts the young space at [`HEAP_START`], followed by the tenured
    /// pools from the next pool boundary on. The stop-the-world heap only has tenured pools.
    pub fn new(mut options: Options) -> Self {
        options.validate_layout();
        let allocator: Box<dyn ObjectAllocator> = if options.is_generational() {
            let young = MemRange::from_start_and_size(
                Address::from_usize(HEAP_START),
                options.young_space_size,
            );
            let tenured_start = young.end().align_up(options.pool_size);
            let tenured = MemRange::from_start_and_size(tenured_start, options.heap_size);
            let pools = Arc::new(PoolManager::new(tenured, options.pool_size));
            Box::new(GenObjectAllocator::new(
                young,
                pools,
                options.max_young_alloc_size,
            ))
        } else {
            let tenured =
                MemRange::from_start_and_size(Address::from_usize(HEAP_START), options.heap_size);
            let pools = Arc::new(PoolManager::new(tenured, options.pool_size));
            Box::new(NonGenObjectAllocator::new(pools))
        };
        let collector = Collector::new(&options, allocator.heap_range());
        let barrier = collector.create_barrier();
        let trigger = GCTrigger::new(&options, collector.is_generational());
        let notifications = NotificationManager::default();
        notifications.add_gc_listener(trigger.listener());

        info!(
            "Initialized {:?} heap at {:?} ({} tenured, young space {})",
            options.gc_type,
            allocator.heap_range(),
            bytes_to_formatted_string(options.heap_size),
            allocator
                .young_space_range()
                .map_or_else(|| "none".to_string(), |r| bytes_to_formatted_string(r.size())),
        );

        HeapManager {
            options,
            state: GlobalState::default(),
            stats: GcStats::default(),
            rendezvous: Rendezvous::new(),
            notifications,
            trigger,
            allocator,
            collector,
            barrier,
            next_mutator_id: AtomicUsize::new(1),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    pub fn rendezvous(&self) -> &Rendezvous {
        &self.rendezvous
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    pub fn trigger(&self) -> &GCTrigger {
        &self.trigger
    }

    pub fn collector(&self) -> &Collector<VM> {
        &self.collector
    }

    pub fn allocator(&self) -> &dyn ObjectAllocator {
        self.allocator.as_ref()
    }

    pub fn barrier(&self) -> &dyn Barrier {
        self.barrier.as_ref()
    }

    /// Bytes currently occupied by objects.
    pub fn footprint(&self) -> usize {
        self.allocator.footprint()
    }

    /// The header of `object`. Panics if `object` does not refer to an object in this heap,
    /// which means the object graph is corrupted.
    pub fn object(&self, object: ObjectReference) -> Arc<HeapObject> {
        match self.allocator.get_object(object) {
            Some(header) => header,
            None => panic!("Reference to {} which is not an object", object),
        }
    }

    pub(crate) fn register_mutator(&self) -> MutatorId {
        let id = MutatorId::new(self.next_mutator_id.fetch_add(1, Ordering::Relaxed));
        self.rendezvous.register_mutator(id);
        id
    }

    pub(crate) fn unregister_mutator(&self, id: MutatorId) {
        self.state.clear_pending_oom(id);
        self.rendezvous.unregister_mutator(id);
    }

    /// Allocate an object with `num_fields` reference slots and `payload_bytes` of raw data.
    /// A movable object may start in the young space; a non-movable one goes straight to the
    /// tenured space.
    ///
    /// Collections are triggered as needed. A movable object gets up to
    /// [`ALLOC_RETRY`](crate::util::alloc::ALLOC_RETRY) collections, a non-movable one a
    /// single out-of-memory collection. If the heap is still exhausted, the VM is told through
    /// [`Collection::out_of_memory`] and the out-of-memory condition stays pending on
    /// `mutator`.
    pub fn allocate(
        &self,
        mutator: MutatorId,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
        movable: bool,
    ) -> Result<ObjectReference, AllocationError> {
        let size = HeapObject::size_for(num_fields, payload_bytes);
        if size > self.allocator.max_object_size() {
            warn!(
                "{} asked for {} bytes, more than the largest object of {} bytes",
                mutator,
                size,
                self.allocator.max_object_size()
            );
            return Err(AllocationError::ObjectTooLarge);
        }

        if self.trigger.poll(self.footprint()) {
            wait_for_gc(
                self,
                GCTask::new(GCTaskCause::HeapUsageThreshold, Some(mutator)),
            );
        }

        let object = if movable {
            self.allocate_with_retries(mutator, class, num_fields, payload_bytes)
        } else {
            self.allocate_non_movable(mutator, class, num_fields, payload_bytes)
        };
        if let Some(object) = object {
            return Ok(object);
        }

        error!(
            "{} is out of memory allocating {} bytes (footprint {})",
            mutator,
            size,
            bytes_to_formatted_string(self.footprint())
        );
        self.state.set_pending_oom(mutator);
        VM::VMCollection::out_of_memory(mutator, AllocationError::HeapOutOfMemory);
        Err(AllocationError::HeapOutOfMemory)
    }

    fn allocate_with_retries(
        &self,
        mutator: MutatorId,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
    ) -> Option<ObjectReference> {
        let mut retry = AllocRetry::new(self.collector.is_generational());
        loop {
            if let Some(object) = self.try_allocate(mutator, class, num_fields, payload_bytes, true)
            {
                return Some(object);
            }
            let cause = retry.next_cause()?;
            debug!(
                "{} failed to allocate, attempt {} collects with {:?}",
                mutator,
                retry.attempt(),
                cause
            );
            wait_for_gc(self, GCTask::new(cause, Some(mutator)));
            retry.collected(self.stats.last_reclaimed_bytes());
        }
    }

    /// Non-movable objects are tenured from the start, which only an out-of-memory
    /// collection can help with. They get a single retry.
    fn allocate_non_movable(
        &self,
        mutator: MutatorId,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
    ) -> Option<ObjectReference> {
        self.try_allocate(mutator, class, num_fields, payload_bytes, false)
            .or_else(|| {
                debug!("{} failed to allocate a non-movable object", mutator);
                wait_for_gc(self, GCTask::new(GCTaskCause::Oom, Some(mutator)));
                self.try_allocate(mutator, class, num_fields, payload_bytes, false)
            })
    }

    fn try_allocate(
        &self,
        mutator: MutatorId,
        class: ClassId,
        num_fields: usize,
        payload_bytes: usize,
        movable: bool,
    ) -> Option<ObjectReference> {
        let object = HeapObject::new(num_fields, payload_bytes);
        let (reference, header) = if movable {
            self.allocator.allocate(object)?
        } else {
            self.allocator.allocate_tenured(object)?
        };
        self.state.clear_pending_oom(mutator);
        self.collector.init_gc_bits(self, reference, &header);
        // The class goes in last. Until then sweeps treat the object as alive.
        header.install_class(class);
        trace!("{} allocated {} ({} bytes)", mutator, reference, header.size());
        Some(reference)
    }

    /// Store `target` into field `index` of `src` through the write barrier.
    pub fn write_field(&self, src: ObjectReference, index: usize, target: Option<ObjectReference>) {
        let header = self.object(src);
        self.barrier
            .object_reference_write(src, &header, index, target);
    }

    pub fn read_field(&self, src: ObjectReference, index: usize) -> Option<ObjectReference> {
        self.object(src).load_field(index)
    }

    /// Run a collection for `cause` and wait until it has finished. Returns false if the
    /// request was satisfied by a collection another thread ran meanwhile.
    pub fn collect(&self, cause: GCTaskCause, caller: Option<MutatorId>) -> bool {
        wait_for_gc(self, GCTask::new(cause, caller))
    }

    /// Prepare for forking worker processes: collections run the tenured cycle until
    /// [`HeapManager::post_zygote_fork`]. `caller` is the calling mutator, if any.
    pub fn pre_zygote_fork(&self, caller: Option<MutatorId>) {
        info!("Pre zygote fork");
        self.state.set_fork_preparation(true);
        self.collect(GCTaskCause::PygoteFork, caller);
    }

    pub fn post_zygote_fork(&self) {
        info!("Post zygote fork");
        self.state.set_fork_preparation(false);
    }

    /// Disable tenured collections while the application starts up.
    pub fn pre_startup(&self) {
        debug!("Disable tenured collection during startup");
        self.state.set_tenured_gc_disabled(true);
    }

    pub fn post_startup(&self) {
        debug!("Enable tenured collection after startup");
        self.state.set_tenured_gc_disabled(false);
    }

    /// Did an allocation of `mutator` fail with an out-of-memory condition the VM has not
    /// picked up yet? Clears the condition.
    pub fn take_pending_oom(&self, mutator: MutatorId) -> bool {
        self.state.take_pending_oom(mutator)
    }
}
