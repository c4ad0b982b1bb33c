use crate::plan::gc_task::GCTask;
use crate::util::alloc::AllocationError;
use crate::util::marker::ObjectStatus;
use crate::util::{MutatorId, ObjectReference};
use crate::vm::{ObjectUpdater, RootVisitor, VMBinding, VisitGCRootFlags};

use super::mock_method::*;

use std::default::Default;
use std::sync::Mutex;

pub mod mock_runtime;

lazy_static! {
    // The mutex may get poisoned any time. Accessing this mutex needs to deal with the poisoned case.
    // One can use read/write_mockvm to access mock vm.
    static ref MOCK_VM_INSTANCE: Mutex<MockVM> = Mutex::new(MockVM::default());
}

// The mock methods are boxed closures over 'static arguments.
macro_rules! lifetime {
    ($e: expr) => {
        unsafe { std::mem::transmute($e) }
    };
}

// A mock method is called with the mock VM locked, so a mock closure must not call back
// into the mock VM. The default closures use `mock_runtime`, which has its own lock.
macro_rules! mock {
    ($fn: ident($($arg:expr),*)) => {
        write_mockvm(|mock| mock.$fn.call(($($arg),*)))
    };
}

pub fn read_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&MockVM) -> R,
{
    let lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&lock)
}
pub fn write_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&mut MockVM) -> R,
{
    let mut lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&mut lock)
}

/// Run `test` with the mock VM created by `setup` and a fresh mock runtime. Tests that use
/// the mock VM run one at a time.
pub fn with_mockvm<S, T, C>(setup: S, test: T, cleanup: C)
where
    S: FnOnce() -> MockVM,
    T: FnOnce() + std::panic::UnwindSafe,
    C: FnOnce(),
{
    super::serial_test(|| {
        // Setup
        {
            mock_runtime::reset();
            write_mockvm(|mock| *mock = setup());
        }
        super::with_cleanup(test, cleanup);
    })
}

pub fn default_setup() -> MockVM {
    MockVM::default()
}

pub fn no_cleanup() {}

pub struct MockVM {
    // scanning
    pub visit_roots: MockMethod<&'static mut dyn RootVisitor, ()>,
    pub visit_class_roots: MockMethod<(&'static mut dyn RootVisitor, VisitGCRootFlags), ()>,
    pub update_roots: MockMethod<&'static mut dyn ObjectUpdater, ()>,
    // collection
    pub out_of_memory: MockMethod<(MutatorId, AllocationError), ()>,
    pub handle_references: MockMethod<GCTask, ()>,
    pub handle_enqueue_references: MockMethod<(), ()>,
    pub handle_buffer_data: MockMethod<bool, ()>,
    pub handle_gc_finished: MockMethod<(), ()>,
    // string table
    pub string_table_visit_roots:
        MockMethod<(&'static mut dyn RootVisitor, VisitGCRootFlags), ()>,
    pub string_table_sweep:
        MockMethod<&'static mut dyn FnMut(ObjectReference) -> ObjectStatus, usize>,
    pub string_table_update_moved: MockMethod<&'static mut dyn ObjectUpdater, ()>,
    // monitors
    pub deflate_monitors: MockMethod<(), usize>,
    pub deflate_monitors_with: MockMethod<&'static mut dyn FnMut(ObjectReference) -> bool, usize>,
    pub monitor_update_moved: MockMethod<&'static mut dyn ObjectUpdater, ()>,
}

impl Default for MockVM {
    fn default() -> Self {
        Self {
            visit_roots: MockMethod::new_fixed(Box::new(|visitor| {
                mock_runtime::visit_stack_roots(visitor)
            })),
            visit_class_roots: MockMethod::new_fixed(Box::new(|(visitor, flags)| {
                mock_runtime::visit_class_roots(visitor, flags)
            })),
            update_roots: MockMethod::new_fixed(Box::new(|updater| {
                mock_runtime::update_stack_and_class_roots(updater)
            })),

            out_of_memory: MockMethod::new_fixed(Box::new(|(mutator, err)| {
                panic!("Out of memory with {:?} on {}!", err, mutator)
            })),
            handle_references: MockMethod::new_default(),
            handle_enqueue_references: MockMethod::new_default(),
            handle_buffer_data: MockMethod::new_default(),
            handle_gc_finished: MockMethod::new_default(),

            string_table_visit_roots: MockMethod::new_fixed(Box::new(|(visitor, flags)| {
                mock_runtime::visit_string_roots(visitor, flags)
            })),
            string_table_sweep: MockMethod::new_fixed(Box::new(|checker| {
                mock_runtime::sweep_strings(checker)
            })),
            string_table_update_moved: MockMethod::new_fixed(Box::new(|updater| {
                mock_runtime::update_strings(updater)
            })),

            deflate_monitors: MockMethod::new_fixed(Box::new(|()| {
                mock_runtime::deflate_idle_monitors()
            })),
            deflate_monitors_with: MockMethod::new_fixed(Box::new(|should_deflate| {
                mock_runtime::deflate_monitors_with(should_deflate)
            })),
            monitor_update_moved: MockMethod::new_fixed(Box::new(|updater| {
                mock_runtime::update_monitors(updater)
            })),
        }
    }
}

unsafe impl Sync for MockVM {}
unsafe impl Send for MockVM {}

impl VMBinding for MockVM {
    type VMScanning = MockVM;
    type VMCollection = MockVM;
    type VMStringTable = MockVM;
    type VMMonitorPool = MockVM;
}

impl crate::vm::Scanning<MockVM> for MockVM {
    fn visit_roots(visitor: &mut dyn RootVisitor) {
        mock!(visit_roots(lifetime!(visitor)))
    }

    fn visit_class_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags) {
        mock!(visit_class_roots(lifetime!(visitor), flags))
    }

    fn update_roots(updater: &mut dyn ObjectUpdater) {
        mock!(update_roots(lifetime!(updater)))
    }
}

impl crate::vm::Collection<MockVM> for MockVM {
    fn out_of_memory(mutator: MutatorId, err_kind: AllocationError) {
        mock!(out_of_memory(mutator, err_kind))
    }

    fn handle_references(task: &GCTask) {
        mock!(handle_references(*task))
    }

    fn handle_enqueue_references() {
        mock!(handle_enqueue_references())
    }

    fn handle_buffer_data(reversed: bool) {
        mock!(handle_buffer_data(reversed))
    }

    fn handle_gc_finished() {
        mock!(handle_gc_finished())
    }
}

impl crate::vm::StringTable<MockVM> for MockVM {
    fn visit_roots(visitor: &mut dyn RootVisitor, flags: VisitGCRootFlags) {
        mock!(string_table_visit_roots(lifetime!(visitor), flags))
    }

    fn sweep(checker: &mut dyn FnMut(ObjectReference) -> ObjectStatus) -> usize {
        mock!(string_table_sweep(lifetime!(checker)))
    }

    fn update_moved(updater: &mut dyn ObjectUpdater) {
        mock!(string_table_update_moved(lifetime!(updater)))
    }
}

impl crate::vm::MonitorPool<MockVM> for MockVM {
    fn deflate_monitors() -> usize {
        mock!(deflate_monitors())
    }

    fn deflate_monitors_with(should_deflate: &mut dyn FnMut(ObjectReference) -> bool) -> usize {
        mock!(deflate_monitors_with(lifetime!(should_deflate)))
    }

    fn update_moved(updater: &mut dyn ObjectUpdater) {
        mock!(monitor_update_moved(lifetime!(updater)))
    }
}
