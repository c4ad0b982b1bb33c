use crate::util::ObjectReference;
use crate::vm::VMBinding;

use std::fmt;
use std::ops::BitOr;

/// Where a root was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RootType {
    Unknown,
    /// An interpreter or compiled stack frame.
    Frame,
    /// A thread-local handle.
    Thread,
    /// A class or a static field held by the class linker.
    ClassLinker,
    /// An interned string.
    StringTable,
    /// Any other reference held by the VM.
    Vm,
}

/// A reference from outside the object graph.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct GCRoot {
    root_type: RootType,
    object: ObjectReference,
}

impl GCRoot {
    pub fn new(root_type: RootType, object: ObjectReference) -> Self {
        GCRoot { root_type, object }
    }

    pub fn root_type(&self) -> RootType {
        self.root_type
    }

    pub fn object(&self) -> ObjectReference {
        self.object
    }
}

impl fmt::Debug for GCRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} root {}", self.root_type, self.object)
    }
}

/// Selects which roots a root provider reports, and whether it records roots that are
/// created afterwards.
///
/// Exactly one of `ACCESS_ROOT_ALL`, `ACCESS_ROOT_ONLY_NEW` and `ACCESS_ROOT_NONE` must be
/// set. At most one of `START_RECORDING_NEW_ROOT` and `END_RECORDING_NEW_ROOT` may be set.
/// Ending the recording also forgets the roots recorded so far.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct VisitGCRootFlags(u32);

impl VisitGCRootFlags {
    pub const ACCESS_ROOT_ALL: VisitGCRootFlags = VisitGCRootFlags(1);
    /// Only the roots recorded since recording started.
    pub const ACCESS_ROOT_ONLY_NEW: VisitGCRootFlags = VisitGCRootFlags(1 << 1);
    pub const ACCESS_ROOT_NONE: VisitGCRootFlags = VisitGCRootFlags(1 << 2);
    pub const START_RECORDING_NEW_ROOT: VisitGCRootFlags = VisitGCRootFlags(1 << 10);
    pub const END_RECORDING_NEW_ROOT: VisitGCRootFlags = VisitGCRootFlags(1 << 11);

    const ACCESS_MASK: u32 = 0b111;

    pub fn contains(self, other: VisitGCRootFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Which roots to report.
    pub fn access(self) -> RootAccess {
        match self.0 & Self::ACCESS_MASK {
            1 => RootAccess::All,
            2 => RootAccess::OnlyNew,
            4 => RootAccess::None,
            _ => panic!("Invalid root access in {:?}", self),
        }
    }

    /// `Some(true)` if recording starts, `Some(false)` if it ends.
    pub fn recording(self) -> Option<bool> {
        let start = self.contains(Self::START_RECORDING_NEW_ROOT);
        let end = self.contains(Self::END_RECORDING_NEW_ROOT);
        match (start, end) {
            (true, true) => panic!("Recording both starts and ends in {:?}", self),
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}

impl BitOr for VisitGCRootFlags {
    type Output = VisitGCRootFlags;
    fn bitor(self, rhs: VisitGCRootFlags) -> VisitGCRootFlags {
        VisitGCRootFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for VisitGCRootFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VisitGCRootFlags({:#x})", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootAccess {
    All,
    OnlyNew,
    None,
}

/// Callback trait of root-enumerating functions.
pub trait RootVisitor {
    fn visit_root(&mut self, root: GCRoot);
}

/// This lets us use closures as RootVisitor.
impl<F: FnMut(GCRoot)> RootVisitor for F {
    fn visit_root(&mut self, root: GCRoot) {
        self(root)
    }
}

/// Callback trait of functions that rewrite references to moved objects.
pub trait ObjectUpdater {
    /// Return the new location of `object` if it has moved.
    fn update(&mut self, object: ObjectReference) -> Option<ObjectReference>;
}

/// This lets us use closures as ObjectUpdater.
impl<F: FnMut(ObjectReference) -> Option<ObjectReference>> ObjectUpdater for F {
    fn update(&mut self, object: ObjectReference) -> Option<ObjectReference> {
        self(object)
    }
}

/// VM-specific methods for enumerating and updating roots.
pub trait Scanning<VM: VMBinding> {
    /// Report the roots held by threads: stack frames and thread-local handles. Called with
    /// every mutator stopped.
    fn visit_roots(visitor: &mut dyn RootVisitor);

    /// Report the roots held by the class linker. May be called while mutators run; the
    /// provider records classes created after `START_RECORDING_NEW_ROOT`.
    fn visit_class_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags);

    /// Rewrite every thread root and class root for which `updater` returns a new location.
    fn update_roots(updater: &mut dyn ObjectUpdater);
}
