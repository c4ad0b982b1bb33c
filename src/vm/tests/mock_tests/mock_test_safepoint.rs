// Several mutator threads allocate and request collections. Collections never overlap, and
// the stop-the-world parts of a collection never run while a mutator runs.

use super::mock_test_prelude::*;
use crate::plan::Mutator;
use crate::util::rendezvous::MutatorState;
use crate::util::test_util::panic_after;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const MUTATORS: usize = 4;
const ITERATIONS: usize = 200;

fn mutator_loop(mutator: Box<Mutator<MockVM>>, index: usize) {
    let mutator: &Mutator<MockVM> = &mutator;
    let heap = mutator.heap().clone();
    for i in 0..ITERATIONS {
        let object = memory_manager::alloc(mutator, TEST_CLASS, 2, 64).unwrap();
        memory_manager::object_reference_write(mutator, object, 0, Some(object));
        if i % 50 == index {
            memory_manager::handle_user_collection_request(&heap, Some(mutator));
        } else if i % 7 == 0 {
            let _native = mutator.native_scope();
            thread::sleep(Duration::from_micros(100));
        } else {
            memory_manager::safepoint_poll(mutator);
        }
    }
    assert_eq!(
        heap.rendezvous().mutator_state(mutator.id()),
        Some(MutatorState::Running)
    );
}

fn safepoint_exclusion(gc_type: GcType) {
    let in_gc = Arc::new(AtomicUsize::new(0));
    let setup_in_gc = in_gc.clone();
    with_mockvm(
        move || MockVM {
            // Reference processing runs in stop-the-world phases only.
            handle_references: MockMethod::new_fixed(Box::new(move |_| {
                assert_eq!(setup_in_gc.fetch_add(1, Ordering::SeqCst), 0);
                thread::sleep(Duration::from_micros(200));
                setup_in_gc.fetch_sub(1, Ordering::SeqCst);
            })),
            ..MockVM::default()
        },
        move || {
            let fixture = HeapFixture::create(gc_type);
            let heap = fixture.heap.clone();
            let mutators = (0..MUTATORS)
                .map(|_| memory_manager::bind_mutator(&heap))
                .collect::<Vec<_>>();
            panic_after(60_000, move || {
                let handles = mutators
                    .into_iter()
                    .enumerate()
                    .map(|(index, mutator)| thread::spawn(move || mutator_loop(mutator, index)))
                    .collect::<Vec<_>>();
                for handle in handles {
                    handle.join().unwrap();
                }
            });

            assert_eq!(in_gc.load(Ordering::SeqCst), 0);
            assert!(memory_manager::gc_count(&fixture.heap) >= MUTATORS as u64);
            assert!(!fixture.heap.rendezvous().is_in_safepoint());
            assert_eq!(fixture.heap.rendezvous().number_of_mutators(), 0);
            assert_eq!(memory_manager::verify_heap(&fixture.heap, None), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn safepoint_exclusion_gen_gc() {
    safepoint_exclusion(GcType::GenGc)
}

#[test]
pub fn safepoint_exclusion_stw() {
    safepoint_exclusion(GcType::Stw)
}

#[test]
pub fn stop_the_world_phases_park_every_mutator() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let heap = fixture.heap.clone();
            let other = memory_manager::bind_mutator(&heap);
            let other_id = other.id();
            let checked = Arc::new(AtomicUsize::new(0));
            {
                let heap = heap.clone();
                let checked = checked.clone();
                write_mockvm(move |mock| {
                    mock.handle_references = MockMethod::new_fixed(Box::new(move |_| {
                        assert!(heap.rendezvous().is_in_safepoint());
                        assert_eq!(
                            heap.rendezvous().mutator_state(other_id),
                            Some(MutatorState::Parked)
                        );
                        checked.fetch_add(1, Ordering::SeqCst);
                    }));
                });
            }

            // The other mutator keeps polling until the collection is over.
            let poller = thread::spawn(move || {
                let heap = other.heap().clone();
                while memory_manager::gc_count(&heap) == 0 {
                    memory_manager::safepoint_poll(&*other);
                    thread::sleep(Duration::from_micros(50));
                }
            });
            fixture.collect();
            poller.join().unwrap();
            // Once at the young mark and once at the remark.
            assert_eq!(checked.load(Ordering::SeqCst), 2);
        },
        no_cleanup,
    )
}
