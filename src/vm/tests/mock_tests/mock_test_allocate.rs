use super::mock_test_prelude::*;
use crate::plan::gc_task::GCTask;
use crate::util::alloc::{AllocationError, ALLOC_RETRY};
use crate::util::notification::GCListener;

use std::sync::{Arc, Mutex};

const PAYLOAD: usize = 1024;

fn ignore_out_of_memory() -> MockVM {
    MockVM {
        out_of_memory: MockMethod::new_fixed(Box::new(|(_, err)| {
            assert_eq!(err, AllocationError::HeapOutOfMemory)
        })),
        ..MockVM::default()
    }
}

#[derive(Default)]
struct CauseRecorder {
    causes: Mutex<Vec<GCTaskCause>>,
}

impl GCListener for CauseRecorder {
    fn gc_started(&self, task: &GCTask, _heap_size: usize) {
        self.causes.lock().unwrap().push(task.cause);
    }
}

#[test]
pub fn full_young_space_triggers_young_collection() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let young_size = fixture.heap().options().young_space_size;
            for _ in 0..(2 * young_size / PAYLOAD) {
                let object =
                    memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, PAYLOAD).unwrap();
                assert!(fixture.is_young(object));
            }
            assert!(memory_manager::gc_count(fixture.heap()) >= 1);
            assert_eq!(fixture.heap().state().last_cause(), GCTaskCause::YoungGc);
            assert_eq!(fixture.heap().stats().total().tenured_collections, 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn large_objects_skip_young_space() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let max_young = fixture.heap().allocator().young_alloc_max_size();
            let small = memory_manager::alloc(fixture.mutator(), TEST_CLASS, 1, 0).unwrap();
            let large =
                memory_manager::alloc(fixture.mutator(), TEST_CLASS, 1, max_young).unwrap();
            assert!(fixture.is_young(small));
            assert!(!fixture.is_young(large));
            let non_movable = fixture.alloc_tenured(0);
            assert!(!fixture.is_young(non_movable));
        },
        no_cleanup,
    )
}

#[test]
pub fn object_too_large() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let too_large = fixture.heap().allocator().max_object_size() * 2;
            let result = memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, too_large);
            assert_eq!(result, Err(AllocationError::ObjectTooLarge));
            assert_eq!(memory_manager::gc_count(fixture.heap()), 0);
            assert!(!read_mockvm(|mock| mock.out_of_memory.is_called()));
        },
        no_cleanup,
    )
}

#[test]
pub fn garbage_is_reclaimed_before_failing() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::Stw);
            options.heap_size = 2 * options.pool_size;
            let fixture = MutatorFixture::create_with_options(options);
            // Fill the heap with garbage until an allocation has to collect.
            let mut allocated = 0;
            while memory_manager::gc_count(fixture.heap()) == 0 {
                memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, PAYLOAD).unwrap();
                allocated += 1;
            }
            assert!(allocated * PAYLOAD >= fixture.heap().options().heap_size / 2);
            assert!(fixture.heap().stats().last_reclaimed_bytes() > 0);
            for _ in 0..8 {
                memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, PAYLOAD).unwrap();
            }
            assert_eq!(memory_manager::gc_count(fixture.heap()), 1);
            assert_eq!(fixture.heap().state().last_cause(), GCTaskCause::Oom);
            assert!(!memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
        },
        no_cleanup,
    )
}

#[test]
pub fn out_of_memory_after_retries() {
    with_mockvm(
        ignore_out_of_memory,
        || {
            let mut options = test_options(GcType::Stw);
            options.heap_size = 2 * options.pool_size;
            let fixture = MutatorFixture::create_with_options(options);
            let result = loop {
                match memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, PAYLOAD) {
                    Ok(object) => mock_runtime::add_stack_root(object),
                    Err(e) => break e,
                }
            };
            assert_eq!(result, AllocationError::HeapOutOfMemory);
            // Every attempt collected, none of them reclaimed anything.
            assert_eq!(memory_manager::gc_count(fixture.heap()), ALLOC_RETRY as u64);
            assert_eq!(fixture.heap().state().last_cause(), GCTaskCause::Oom);
            assert_eq!(read_mockvm(|mock| mock.out_of_memory.call_count()), 1);
            assert!(memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn young_allocation_escalates_to_oom_collection() {
    with_mockvm(
        ignore_out_of_memory,
        || {
            let mut options = test_options(GcType::GenGc);
            // Young objects can never be moved.
            options.heap_size = options.young_space_size;
            let fixture = MutatorFixture::create_with_options(options);
            let recorder = Arc::new(CauseRecorder::default());
            memory_manager::add_gc_listener(fixture.heap(), recorder.clone());

            let result = loop {
                match memory_manager::alloc(fixture.mutator(), TEST_CLASS, 0, PAYLOAD) {
                    Ok(object) => mock_runtime::add_stack_root(object),
                    Err(e) => break e,
                }
            };
            assert_eq!(result, AllocationError::HeapOutOfMemory);
            let causes = recorder.causes.lock().unwrap().clone();
            assert_eq!(
                causes,
                vec![
                    GCTaskCause::YoungGc,
                    GCTaskCause::YoungGc,
                    GCTaskCause::Oom,
                    GCTaskCause::YoungGc
                ]
            );
            assert_eq!(fixture.heap().stats().total().tenured_collections, 1);
            assert!(memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
        },
        no_cleanup,
    )
}

#[test]
pub fn non_movable_allocation_collects_once() {
    with_mockvm(
        ignore_out_of_memory,
        || {
            let mut options = test_options(GcType::GenGc);
            options.heap_size = 2 * options.pool_size;
            let fixture = MutatorFixture::create_with_options(options);
            let alloc =
                || memory_manager::alloc_non_movable(fixture.mutator(), TEST_CLASS, 0, PAYLOAD);
            while let Ok(object) = alloc() {
                mock_runtime::add_stack_root(object);
            }
            let recorder = Arc::new(CauseRecorder::default());
            memory_manager::add_gc_listener(fixture.heap(), recorder.clone());
            let gc_count = memory_manager::gc_count(fixture.heap());

            assert_eq!(alloc(), Err(AllocationError::HeapOutOfMemory));
            assert_eq!(recorder.causes.lock().unwrap().clone(), vec![GCTaskCause::Oom]);
            assert_eq!(memory_manager::gc_count(fixture.heap()), gc_count + 1);
            assert_eq!(read_mockvm(|mock| mock.out_of_memory.call_count()), 2);

            // Once the collection frees a pool, the retry succeeds.
            mock_runtime::clear_stack_roots();
            assert!(alloc().is_ok());
            assert_eq!(recorder.causes.lock().unwrap().len(), 2);
            assert!(!memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
        },
        no_cleanup,
    )
}
