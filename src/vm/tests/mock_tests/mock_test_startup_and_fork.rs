use super::mock_test_prelude::*;

fn tenured_collections(fixture: &MutatorFixture) -> usize {
    fixture.heap().stats().last_cycle().tenured_collections
}

#[test]
pub fn tenured_collection_waits_for_startup() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            memory_manager::pre_startup(fixture.heap());
            let tenured = fixture.alloc_tenured(0);
            let young = fixture.alloc(0);

            fixture.collect();
            assert_eq!(memory_manager::gc_count(fixture.heap()), 1);
            assert_eq!(tenured_collections(&fixture), 0);
            assert!(fixture.is_live(tenured));
            assert!(!fixture.is_live(young));

            memory_manager::post_startup(fixture.heap());
            fixture.collect();
            assert_eq!(tenured_collections(&fixture), 1);
            assert!(!fixture.is_live(tenured));
        },
        no_cleanup,
    )
}

#[test]
pub fn out_of_memory_collects_tenured_during_startup() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            memory_manager::pre_startup(fixture.heap());
            let tenured = fixture.alloc_tenured(0);
            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::Oom,
                Some(fixture.mutator()),
            );
            assert_eq!(tenured_collections(&fixture), 1);
            assert!(!fixture.is_live(tenured));
        },
        no_cleanup,
    )
}

#[test]
pub fn fork_preparation_collects_everything() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            memory_manager::pre_startup(fixture.heap());
            let garbage = fixture.alloc_tenured(0);

            memory_manager::pre_zygote_fork(fixture.heap(), Some(fixture.mutator()));
            assert!(fixture.heap().state().is_fork_preparation());
            assert_eq!(fixture.heap().state().last_cause(), GCTaskCause::PygoteFork);
            assert_eq!(tenured_collections(&fixture), 1);
            assert!(!fixture.is_live(garbage));

            // Until the fork is done, even young collections include the tenured space.
            let garbage = fixture.alloc_tenured(0);
            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );
            assert_eq!(tenured_collections(&fixture), 1);
            assert!(!fixture.is_live(garbage));

            memory_manager::post_zygote_fork(fixture.heap());
            assert!(!fixture.heap().state().is_fork_preparation());
            let garbage = fixture.alloc_tenured(0);
            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );
            assert_eq!(tenured_collections(&fixture), 0);
            assert!(fixture.is_live(garbage));
        },
        no_cleanup,
    )
}

#[test]
pub fn fork_preparation_without_mutator() {
    with_mockvm(
        default_setup,
        || {
            let fixture = HeapFixture::create(GcType::Stw);
            memory_manager::pre_zygote_fork(&fixture.heap, None);
            assert_eq!(memory_manager::gc_count(&fixture.heap), 1);
            memory_manager::post_zygote_fork(&fixture.heap);
        },
        no_cleanup,
    )
}

#[test]
pub fn major_collections_are_spaced_out() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::GenGc);
            options.major_gc_period = 2;
            let fixture = MutatorFixture::create_with_options(options);
            let mut majors = vec![];
            for _ in 0..6 {
                fixture.collect();
                majors.push(tenured_collections(&fixture));
            }
            assert_eq!(majors, vec![0, 0, 1, 0, 0, 1]);
        },
        no_cleanup,
    )
}

fn young_gcs_since_major(fixture: &MutatorFixture) -> usize {
    match fixture.heap().collector() {
        crate::plan::Collector::Generational(gc) => gc.young_gcs_since_major(),
        crate::plan::Collector::StopTheWorld(_) => unreachable!(),
    }
}

#[test]
pub fn aborted_young_collections_are_not_counted() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::GenGc);
            options.major_gc_period = 4;
            options.heap_size = 3 * options.pool_size;
            let fixture = MutatorFixture::create_with_options(options);
            // Leave less tenured space than moving the young space may need.
            let need = 2 * fixture.heap().options().young_space_size;
            while fixture.heap().allocator().tenured_free_bytes() >= need {
                let object =
                    memory_manager::alloc_non_movable(fixture.mutator(), TEST_CLASS, 0, 1024)
                        .unwrap();
                mock_runtime::add_stack_root(object);
            }

            for _ in 0..2 {
                memory_manager::request_collection(
                    fixture.heap(),
                    GCTaskCause::YoungGc,
                    Some(fixture.mutator()),
                );
                assert_eq!(tenured_collections(&fixture), 0);
                assert_eq!(young_gcs_since_major(&fixture), 0);
            }

            // The young space could not be moved, so the tenured collection runs before
            // its period is up.
            fixture.collect();
            assert_eq!(tenured_collections(&fixture), 1);
            assert_eq!(young_gcs_since_major(&fixture), 0);

            mock_runtime::clear_stack_roots();
            fixture.collect();
            assert!(fixture.heap().allocator().tenured_free_bytes() >= need);
            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );
            assert_eq!(young_gcs_since_major(&fixture), 1);
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}
