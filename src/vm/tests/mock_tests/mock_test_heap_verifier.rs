use super::mock_test_prelude::*;

/// A reference into the heap range that does not point to an object.
fn bogus_reference(fixture: &MutatorFixture) -> ObjectReference {
    let range = fixture.heap().allocator().heap_range();
    (range.start() + range.size() / 2)
        .to_object_reference()
        .unwrap()
}

#[test]
pub fn healthy_heap_passes() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let root = fixture.alloc_rooted(2);
            let child = fixture.alloc_tenured(1);
            fixture.write(root, 0, Some(child));
            fixture.write(child, 0, Some(root));
            mock_runtime::add_class_root(child);
            assert_eq!(fixture.verify(), 0);
        },
        no_cleanup,
    )
}

#[test]
pub fn dangling_root_is_reported() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            fixture.alloc_rooted(0);
            mock_runtime::add_stack_root(bogus_reference(&fixture));
            mock_runtime::add_class_root(bogus_reference(&fixture));
            assert_eq!(fixture.verify(), 2);
            // The verifier does not collect.
            assert_eq!(memory_manager::gc_count(fixture.heap()), 0);
            assert!(!fixture.heap().state().is_gc_in_progress());
        },
        no_cleanup,
    )
}

#[test]
pub fn dangling_string_is_reported() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::GenGc);
            let string = fixture.alloc_tenured(0);
            mock_runtime::intern_string(string, true);
            assert_eq!(fixture.verify(), 0);

            mock_runtime::intern_string(bogus_reference(&fixture), true);
            // Weak entries are not roots.
            mock_runtime::intern_string(bogus_reference(&fixture), false);
            assert_eq!(fixture.verify(), 1);
        },
        no_cleanup,
    )
}

#[test]
pub fn dangling_field_is_reported() {
    with_mockvm(
        default_setup,
        || {
            let fixture = MutatorFixture::create(GcType::Stw);
            let holder = fixture.alloc_rooted(3);
            let bogus = bogus_reference(&fixture);
            fixture.write(holder, 0, Some(bogus));
            fixture.write(holder, 2, Some(bogus));
            assert_eq!(fixture.verify(), 2);
        },
        no_cleanup,
    )
}

#[test]
#[should_panic(expected = "Pre GC heap verification failed")]
pub fn failed_verification_aborts_collection() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::GenGc);
            options.pre_gc_heap_verification = true;
            options.fail_on_heap_verification = true;
            let fixture = MutatorFixture::create_with_options(options);
            let holder = fixture.alloc_rooted(1);
            fixture.write(holder, 0, Some(bogus_reference(&fixture)));
            fixture.collect();
        },
        no_cleanup,
    )
}

#[test]
pub fn verification_around_collections() {
    with_mockvm(
        default_setup,
        || {
            let mut options = test_options(GcType::GenGc);
            options.pre_gc_heap_verification = true;
            options.post_gc_heap_verification = true;
            options.fail_on_heap_verification = true;
            let fixture = MutatorFixture::create_with_options(options);
            let holder = fixture.alloc_tenured(1);
            mock_runtime::add_stack_root(holder);
            let young = fixture.alloc(1);
            fixture.write(holder, 0, Some(young));
            fixture.write(young, 0, Some(holder));
            fixture.collect();
            fixture.collect();
            assert_eq!(memory_manager::gc_count(fixture.heap()), 2);
        },
        no_cleanup,
    )
}
