// Basic collections, run once for every collector.

use super::mock_test_prelude::*;

fn collect_unreachable(gc_type: GcType) {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(gc_type);
            let root = fixture.alloc_rooted(2);
            let child = fixture.alloc(0);
            let garbage = fixture.alloc(1);
            fixture.write(root, 0, Some(child));
            fixture.write(garbage, 0, Some(child));

            fixture.collect();

            let roots = mock_runtime::stack_roots();
            assert_eq!(roots.len(), 1);
            let root = roots[0];
            assert!(fixture.is_live(root));
            let child = fixture.read(root, 0).unwrap();
            assert!(fixture.is_live(child));
            assert_eq!(fixture.read(root, 1), None);
            assert!(!fixture.is_live(garbage));
            assert_eq!(fixture.heap().allocator().object_count(), 2);
            assert_eq!(memory_manager::gc_count(fixture.heap()), 1);
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

fn collect_cycle(gc_type: GcType) {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(gc_type);
            let a = fixture.alloc_rooted(1);
            let b = fixture.alloc(1);
            fixture.write(a, 0, Some(b));
            fixture.write(b, 0, Some(a));

            fixture.collect();
            assert_eq!(fixture.heap().allocator().object_count(), 2);
            let a = mock_runtime::stack_roots()[0];
            let b = fixture.read(a, 0).unwrap();
            assert_eq!(fixture.read(b, 0), Some(a));

            // An unreachable cycle is collected.
            mock_runtime::clear_stack_roots();
            fixture.collect();
            assert_eq!(fixture.heap().allocator().object_count(), 0);
            assert!(!fixture.is_live(a));
            assert!(!fixture.is_live(b));
            assert_eq!(memory_manager::used_bytes(fixture.heap()), 0);
        },
        no_cleanup,
    )
}

fn collect_without_mutator(gc_type: GcType) {
    with_mockvm(
        default_setup,
        || {
            let fixture = HeapFixture::create(gc_type);
            assert!(memory_manager::request_collection(
                &fixture.heap,
                GCTaskCause::Explicit,
                None
            ));
            assert!(memory_manager::request_collection(
                &fixture.heap,
                GCTaskCause::NativeAlloc,
                None
            ));
            assert_eq!(fixture.heap.stats().cycles(), 2);
            assert_eq!(fixture.heap.state().last_cause(), GCTaskCause::NativeAlloc);
            assert!(!fixture.heap.state().is_gc_in_progress());
        },
        no_cleanup,
    )
}

fn vm_hooks_are_called(gc_type: GcType) {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(gc_type);
            fixture.alloc_rooted(0);
            fixture.collect();
            read_mockvm(|mock| {
                assert!(mock.handle_references.is_called());
                assert!(mock.handle_buffer_data.is_called());
                assert_eq!(mock.handle_gc_finished.call_count(), 1);
                assert_eq!(mock.handle_enqueue_references.call_count(), 1);
                assert_eq!(mock.deflate_monitors.call_count(), 1);
                assert!(!mock.out_of_memory.is_called());
            });
        },
        no_cleanup,
    )
}

macro_rules! gc_tests {
    ($($name:ident: $gc_type:expr,)*) => {
        paste::paste! {
            $(
                #[test]
                pub fn [<collect_unreachable_ $name>]() {
                    collect_unreachable($gc_type)
                }

                #[test]
                pub fn [<collect_cycle_ $name>]() {
                    collect_cycle($gc_type)
                }

                #[test]
                pub fn [<collect_without_mutator_ $name>]() {
                    collect_without_mutator($gc_type)
                }

                #[test]
                pub fn [<vm_hooks_are_called_ $name>]() {
                    vm_hooks_are_called($gc_type)
                }
            )*
        }
    };
}

gc_tests! {
    gen_gc: GcType::GenGc,
    stw: GcType::Stw,
}
