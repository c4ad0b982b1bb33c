use crate::util::ObjectReference;
use crate::vm::{ObjectUpdater, VMBinding};

/// The pool of inflated monitors. Each monitor belongs to one object. The pool has its own
/// lock, so deflation may run concurrently with mutators.
pub trait MonitorPool<VM: VMBinding> {
    /// Deflate every monitor that is not held and has no waiters. Returns the number of
    /// deflated monitors.
    fn deflate_monitors() -> usize;

    /// Deflate the monitors whose object satisfies `should_deflate`. Used to free the
    /// monitors of dead objects before the objects themselves are freed.
    fn deflate_monitors_with(should_deflate: &mut dyn FnMut(ObjectReference) -> bool) -> usize;

    /// Rewrite the owner of monitors whose object has moved.
    fn update_moved(updater: &mut dyn ObjectUpdater);
}
