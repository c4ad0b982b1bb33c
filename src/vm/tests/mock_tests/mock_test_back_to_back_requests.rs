// Two mutators ask for a collection at the same time. One of them runs it, the other one
// finds its request satisfied once it gets the safepoint.

use super::mock_test_prelude::*;
use crate::heap_manager::HeapManager;
use crate::util::test_util::{panic_after, wait_until};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// The first reference processing call of the collection waits until another request is
/// blocked on the safepoint.
fn hold_until_pending_request(heap: &Arc<HeapManager<MockVM>>) {
    let heap = heap.clone();
    let released = AtomicBool::new(false);
    write_mockvm(|mock| {
        mock.handle_references = MockMethod::new_fixed(Box::new(move |_| {
            wait_until(10_000, || {
                released.load(Ordering::SeqCst) || heap.rendezvous().pending_requests() >= 1
            });
            released.store(true, Ordering::SeqCst);
        }));
    });
}

fn back_to_back(gc_type: GcType) {
    with_mockvm(
        default_setup,
        || {
            let fixture = HeapFixture::create(gc_type);
            let heap = fixture.heap.clone();
            // Hold the collection until the second request is blocked on the safepoint.
            hold_until_pending_request(&heap);

            let mutators = vec![
                memory_manager::bind_mutator(&heap),
                memory_manager::bind_mutator(&heap),
            ];
            let ran = panic_after(10_000, move || {
                let handles = mutators
                    .into_iter()
                    .map(|mutator| {
                        let heap = heap.clone();
                        thread::spawn(move || {
                            memory_manager::request_collection(
                                &heap,
                                GCTaskCause::Explicit,
                                Some(&*mutator),
                            )
                        })
                    })
                    .collect::<Vec<_>>();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .collect::<Vec<bool>>()
            });

            assert_eq!(ran.iter().filter(|r| **r).count(), 1);
            assert_eq!(fixture.heap.stats().cycles(), 1);
            assert_eq!(memory_manager::gc_count(&fixture.heap), 1);
            assert_eq!(fixture.heap.rendezvous().number_of_mutators(), 0);
            // Only the collection that ran is reported to the VM.
            assert_eq!(read_mockvm(|mock| mock.handle_gc_finished.call_count()), 1);
        },
        no_cleanup,
    )
}

#[test]
pub fn back_to_back_requests_gen_gc() {
    back_to_back(GcType::GenGc)
}

#[test]
pub fn back_to_back_requests_stw() {
    back_to_back(GcType::Stw)
}

#[test]
pub fn weaker_cause_is_satisfied_by_stronger() {
    with_mockvm(
        default_setup,
        || {
            let fixture = HeapFixture::create(GcType::GenGc);
            let heap = fixture.heap.clone();
            hold_until_pending_request(&heap);

            let strong = memory_manager::bind_mutator(&heap);
            let explicit_heap = heap.clone();
            let ran = panic_after(10_000, move || {
                let explicit = thread::spawn(move || {
                    memory_manager::request_collection(
                        &explicit_heap,
                        GCTaskCause::Explicit,
                        Some(&*strong),
                    )
                });
                // Make sure the explicit request runs first.
                wait_until(5_000, || heap.state().is_gc_in_progress());
                // A request from a thread that is not a mutator.
                let young =
                    memory_manager::request_collection(&heap, GCTaskCause::YoungGc, None);
                (explicit.join().unwrap(), young)
            });
            assert_eq!(ran, (true, false));
            assert_eq!(fixture.heap.state().last_cause(), GCTaskCause::Explicit);
            assert_eq!(fixture.heap.stats().cycles(), 1);
        },
        no_cleanup,
    )
}

// The reverse order is not satisfied: a young collection does not cover an explicit request.
#[test]
pub fn stronger_cause_runs_after_weaker() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            assert!(memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator())
            ));
            assert!(memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::Explicit,
                Some(fixture.mutator())
            ));
            assert_eq!(fixture.heap().stats().cycles(), 2);
        },
        no_cleanup,
    )
}
