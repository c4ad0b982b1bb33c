// Some tests are conditionally compiled. So not all the code in this module will be used. We simply allow dead code in this module.
#![allow(dead_code)]

use crate::heap_manager::HeapManager;
use crate::memory_manager;
use crate::plan::Mutator;
use crate::util::constants::BYTES_IN_KBYTE;
use crate::util::heap_object::ClassId;
use crate::util::options::{GcTriggerType, GcType, Options};
use crate::util::test_util::mock_vm::{mock_runtime, MockVM};
use crate::util::ObjectReference;

use std::sync::Arc;

pub const TEST_CLASS: ClassId = match ClassId::new(1) {
    Some(class) => class,
    None => panic!("Class ids are non-zero"),
};

/// Options for small test heaps. They do not depend on `GENGC_` environment variables.
pub fn test_options(gc_type: GcType) -> Options {
    let mut options = Options::builtin_defaults();
    options.gc_type = gc_type;
    options.heap_size = 1024 * BYTES_IN_KBYTE;
    options.young_space_size = 64 * BYTES_IN_KBYTE;
    options.pool_size = 64 * BYTES_IN_KBYTE;
    options.max_young_alloc_size = 4 * BYTES_IN_KBYTE;
    // Collections only run when a test asks for them.
    options.gc_trigger_type = GcTriggerType::DebugTrigger;
    options.debug_trigger_start = usize::MAX;
    options
}

pub struct HeapFixture {
    pub heap: Arc<HeapManager<MockVM>>,
}

impl HeapFixture {
    pub fn create(gc_type: GcType) -> Self {
        Self::create_with_options(test_options(gc_type))
    }

    pub fn create_with_options(options: Options) -> Self {
        HeapFixture {
            heap: memory_manager::gc_init::<MockVM>(options),
        }
    }
}

pub struct MutatorFixture {
    // Dropped before the heap.
    pub mutator: Box<Mutator<MockVM>>,
    pub heap: Arc<HeapManager<MockVM>>,
}

impl MutatorFixture {
    pub fn create(gc_type: GcType) -> Self {
        Self::create_with_options(test_options(gc_type))
    }

    pub fn create_with_options(options: Options) -> Self {
        let HeapFixture { heap } = HeapFixture::create_with_options(options);
        let mutator = memory_manager::bind_mutator(&heap);
        MutatorFixture { mutator, heap }
    }

    pub fn mutator(&self) -> &Mutator<MockVM> {
        &self.mutator
    }

    pub fn heap(&self) -> &HeapManager<MockVM> {
        &self.heap
    }

    /// Allocate a movable object with `num_fields` reference fields.
    pub fn alloc(&self, num_fields: usize) -> ObjectReference {
        match memory_manager::alloc(self.mutator(), TEST_CLASS, num_fields, 16) {
            Ok(object) => object,
            Err(e) => panic!("Allocation failed: {}", e),
        }
    }

    /// Allocate a tenured object with `num_fields` reference fields.
    pub fn alloc_tenured(&self, num_fields: usize) -> ObjectReference {
        match memory_manager::alloc_non_movable(self.mutator(), TEST_CLASS, num_fields, 16) {
            Ok(object) => object,
            Err(e) => panic!("Allocation failed: {}", e),
        }
    }

    /// Allocate an object and make it a stack root.
    pub fn alloc_rooted(&self, num_fields: usize) -> ObjectReference {
        let object = self.alloc(num_fields);
        mock_runtime::add_stack_root(object);
        object
    }

    pub fn write(&self, src: ObjectReference, index: usize, target: Option<ObjectReference>) {
        memory_manager::object_reference_write(self.mutator(), src, index, target)
    }

    pub fn read(&self, src: ObjectReference, index: usize) -> Option<ObjectReference> {
        memory_manager::object_reference_read(self.mutator(), src, index)
    }

    /// Run an explicit collection on behalf of the fixture mutator.
    pub fn collect(&self) {
        memory_manager::handle_user_collection_request(self.heap(), Some(self.mutator()));
    }

    pub fn is_young(&self, object: ObjectReference) -> bool {
        self.heap.allocator().is_object_in_young_space(object)
    }

    pub fn is_live(&self, object: ObjectReference) -> bool {
        self.heap.allocator().is_live(object)
    }

    pub fn verify(&self) -> usize {
        memory_manager::verify_heap(self.heap(), Some(self.mutator()))
    }
}
