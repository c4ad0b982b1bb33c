use crate::plan::gc_task::GCTask;
use crate::util::alloc::AllocationError;
use crate::util::MutatorId;
use crate::vm::VMBinding;

/// VM-specific methods for collection. The hooks are called at fixed points of every
/// collection: reference processing after marking, and completion after the mutators are
/// released.
pub trait Collection<VM: VMBinding> {
    /// Inform the VM that a mutator ran out of memory. The collector has also recorded the
    /// condition as pending for the mutator, so the VM may instead pick it up later through
    /// `memory_manager::take_pending_oom` and raise a managed exception.
    ///
    /// Arguments:
    /// * `mutator`: The mutator whose allocation or collection request failed.
    /// * `err_kind`: The kind of the failure.
    fn out_of_memory(mutator: MutatorId, err_kind: AllocationError) {
        panic!("Out of memory with {:?} on {}!", err_kind, mutator);
    }

    /// Process weak, soft and phantom references after marking.
    fn handle_references(_task: &GCTask) {}

    /// Enqueue the references cleared by the last collection. Called after the collection,
    /// with mutators running.
    fn handle_enqueue_references() {}

    /// Let the VM fix up buffers that depend on the mark bit encoding. `reversed` is the
    /// marker's reversed mode during the marking that just finished.
    fn handle_buffer_data(_reversed: bool) {}

    /// Called after every collection that ran, with mutators running.
    fn handle_gc_finished() {}
}
