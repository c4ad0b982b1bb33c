use super::mock_test_prelude::*;
use crate::plan::GarbageCollector;

#[test]
pub fn young_object_is_moved_and_referrers_are_updated() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let holder = fixture.alloc_tenured(1);
            mock_runtime::add_stack_root(holder);
            let young = fixture.alloc(0);
            assert!(fixture.is_young(young));
            assert!(!fixture.is_young(holder));
            fixture.write(holder, 0, Some(young));

            assert!(memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator())
            ));

            let moved = fixture.read(holder, 0).unwrap();
            assert_ne!(moved, young);
            assert!(!fixture.is_young(moved));
            assert!(fixture.is_live(moved));
            assert!(!fixture.is_live(young));
            assert_eq!(fixture.heap().allocator().young_used_bytes(), 0);

            let cycle = fixture.heap().stats().last_cycle();
            assert_eq!(cycle.young_moved_objects, 1);
            assert_eq!(cycle.tenured_collections, 0);
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn young_roots_are_updated() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let a = fixture.alloc_rooted(1);
            let b = fixture.alloc(1);
            fixture.write(a, 0, Some(b));
            fixture.write(b, 0, Some(a));
            mock_runtime::add_class_root(b);

            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );

            let a_moved = mock_runtime::stack_roots()[0];
            let b_moved = mock_runtime::class_roots()[0];
            assert_ne!(a_moved, a);
            assert_ne!(b_moved, b);
            assert_eq!(fixture.read(a_moved, 0), Some(b_moved));
            assert_eq!(fixture.read(b_moved, 0), Some(a_moved));
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn unreachable_young_objects_are_freed() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let dead = (0..10).map(|_| fixture.alloc(2)).collect::<Vec<_>>();
            let tenured_dead = fixture.alloc_tenured(0);

            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );

            assert!(dead.iter().all(|o| !fixture.is_live(*o)));
            let cycle = fixture.heap().stats().last_cycle();
            assert_eq!(cycle.young_moved_objects, 0);
            assert_eq!(cycle.young_freed_objects, 10);
            // A young collection does not sweep the tenured space.
            assert!(fixture.is_live(tenured_dead));
        },
        no_cleanup,
    )
}

#[test]
pub fn young_move_aborts_without_tenured_space() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::GenGc);
            // The tenured space is smaller than twice the young space.
            options.heap_size = options.young_space_size;
            let fixture = MutatorFixture::create_with_options(options);
            let young = fixture.alloc_rooted(0);

            assert!(memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator())
            ));

            // Nothing moved, and the requester has a pending out-of-memory condition.
            assert_eq!(mock_runtime::stack_roots(), vec![young]);
            assert!(fixture.is_young(young));
            assert!(fixture.is_live(young));
            assert_eq!(fixture.heap().stats().last_cycle().young_moved_objects, 0);
            assert!(memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
            assert!(!memory_manager::take_pending_oom(
                fixture.heap(),
                fixture.mutator().id()
            ));
            // Young objects are left unmarked for the next attempt.
            let header = fixture.heap().object(young);
            assert!(!fixture.heap().collector().is_marked(&header));
        },
        no_cleanup,
    )
}
