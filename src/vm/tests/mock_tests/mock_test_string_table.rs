use super::mock_test_prelude::*;

fn interned() -> Vec<(ObjectReference, bool)> {
    mock_runtime::interned_strings()
        .iter()
        .map(|s| (s.object, s.strong))
        .collect()
}

#[test]
pub fn young_strings() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let strong = fixture.alloc(0);
            let weak = fixture.alloc(0);
            let referenced = fixture.alloc_rooted(0);
            mock_runtime::intern_string(strong, true);
            mock_runtime::intern_string(weak, false);
            mock_runtime::intern_string(referenced, false);

            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );

            let strings = interned();
            assert_eq!(strings.len(), 2);
            // Both survivors moved, and their entries with them.
            assert!(strings.iter().all(|(s, _)| !fixture.is_young(*s)));
            assert!(fixture.is_live(strings[0].0));
            assert!(strings[0].1);
            assert_eq!(strings[1], (mock_runtime::stack_roots()[0], false));
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn tenured_weak_strings_wait_for_a_tenured_cycle() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let unreferenced = fixture.alloc_tenured(0);
            let referenced = fixture.alloc_tenured(0);
            mock_runtime::add_stack_root(referenced);
            mock_runtime::intern_string(unreferenced, false);
            mock_runtime::intern_string(referenced, false);

            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            );
            assert_eq!(
                interned(),
                vec![(unreferenced, false), (referenced, false)]
            );

            fixture.collect();
            assert_eq!(interned(), vec![(referenced, false)]);
            assert!(!fixture.is_live(unreferenced));
        },
        no_cleanup,
    )
}

#[test]
pub fn strings_stw() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            let strong = fixture.alloc(0);
            let weak = fixture.alloc(0);
            let referenced = fixture.alloc_rooted(0);
            mock_runtime::intern_string(strong, true);
            mock_runtime::intern_string(weak, false);
            mock_runtime::intern_string(referenced, false);

            fixture.collect();
            assert_eq!(interned(), vec![(strong, true), (referenced, false)]);
            assert!(fixture.is_live(strong));
            assert!(!fixture.is_live(weak));

            // Again with the reversed mark bit.
            mock_runtime::clear_stack_roots();
            fixture.collect();
            assert_eq!(interned(), vec![(strong, true)]);
        },
        no_cleanup,
    )
}

#[test]
pub fn sweep_reports_removed_entries() {
    with_mockvm(
        || MockVM {
            string_table_sweep: MockMethod::new_fixed(Box::new(|checker| {
                let removed = mock_runtime::sweep_strings(checker);
                assert_eq!(removed, 1);
                removed
            })),
            ..MockVM::default()
        },
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            let weak = fixture.alloc(0);
            mock_runtime::intern_string(weak, false);
            fixture.collect();
            assert!(read_mockvm(|mock| mock.string_table_sweep.is_called()));
        },
        no_cleanup,
    )
}
