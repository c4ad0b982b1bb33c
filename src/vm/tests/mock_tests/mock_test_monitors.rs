use super::mock_test_prelude::*;

fn monitor_objects() -> Vec<ObjectReference> {
    mock_runtime::monitors().iter().map(|m| m.object).collect()
}

#[test]
pub fn monitors_follow_their_objects_gen_gc() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let rooted_tenured = fixture.alloc_tenured(0);
            let dead_tenured = fixture.alloc_tenured(0);
            let idle_tenured = fixture.alloc_tenured(0);
            mock_runtime::add_stack_root(rooted_tenured);
            mock_runtime::add_stack_root(idle_tenured);
            let rooted_young = fixture.alloc_rooted(0);
            let dead_young = fixture.alloc(0);

            mock_runtime::inflate_monitor(rooted_tenured, false);
            mock_runtime::inflate_monitor(dead_tenured, false);
            mock_runtime::inflate_monitor(idle_tenured, true);
            mock_runtime::inflate_monitor(rooted_young, false);
            mock_runtime::inflate_monitor(dead_young, false);

            fixture.collect();

            let moved = mock_runtime::stack_roots()[2];
            assert_ne!(moved, rooted_young);
            assert!(!fixture.is_young(moved));
            assert_eq!(monitor_objects(), vec![rooted_tenured, moved]);
            assert!(mock_runtime::monitors().iter().all(|m| !m.idle));
        },
        no_cleanup,
    )
}

#[test]
pub fn young_collection_only_deflates_young_monitors() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let dead_tenured = fixture.alloc_tenured(0);
            let dead_young = fixture.alloc(0);
            mock_runtime::inflate_monitor(dead_tenured, false);
            mock_runtime::inflate_monitor(dead_young, false);

            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );

            // The tenured space was not collected.
            assert_eq!(monitor_objects(), vec![dead_tenured]);
            assert!(fixture.is_live(dead_tenured));
        },
        no_cleanup,
    )
}

#[test]
pub fn monitors_follow_their_objects_stw() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            let rooted = fixture.alloc_rooted(0);
            let dead = fixture.alloc(0);
            let idle = fixture.alloc_rooted(0);
            mock_runtime::inflate_monitor(rooted, false);
            mock_runtime::inflate_monitor(dead, false);
            mock_runtime::inflate_monitor(idle, true);

            fixture.collect();
            assert_eq!(monitor_objects(), vec![rooted]);
            assert!(fixture.is_live(idle));

            mock_runtime::remove_stack_root(rooted);
            fixture.collect();
            assert!(monitor_objects().is_empty());
            assert!(!fixture.is_live(rooted));
        },
        no_cleanup,
    )
}

#[test]
pub fn idle_monitors_are_deflated_before_each_collection() {
    with_mockvm(
        || MockVM {
            deflate_monitors: MockMethod::new_sequence(vec![
                Box::new(|()| mock_runtime::deflate_idle_monitors()),
                Box::new(|()| 0),
            ]),
            ..MockVM::default()
        },
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            let object = fixture.alloc_rooted(0);
            mock_runtime::inflate_monitor(object, true);
            fixture.collect();
            assert!(monitor_objects().is_empty());

            mock_runtime::inflate_monitor(object, true);
            fixture.collect();
            assert_eq!(monitor_objects(), vec![object]);
            assert_eq!(read_mockvm(|mock| mock.deflate_monitors.call_count()), 2);
        },
        no_cleanup,
    )
}
