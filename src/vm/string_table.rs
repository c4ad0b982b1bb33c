use crate::util::marker::ObjectStatus;
use crate::util::ObjectReference;
use crate::vm::{ObjectUpdater, RootVisitor, VMBinding, VisitGCRootFlags};

/// The interned string table of the VM. Its entries are weak: the collector reports them
/// as roots only where that is needed for a snapshot, and sweeps entries whose string died.
pub trait StringTable<VM: VMBinding> {
    /// Report the strings selected by `flags`, and start or stop recording strings interned
    /// afterwards.
    fn visit_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags);

    /// Remove every entry for which `checker` reports the string dead. Returns the number of
    /// removed entries.
    fn sweep(checker: &mut dyn FnMut(ObjectReference) -> ObjectStatus) -> usize;

    /// Rewrite entries whose string has moved.
    fn update_moved(updater: &mut dyn ObjectUpdater);
}
