use criterion::Criterion;

use gengc::util::test_util::mock_vm::*;

pub mod alloc;
pub mod collect;

pub fn bench(c: &mut Criterion) {
    mock_runtime::reset();
    write_mockvm(|mock| *mock = MockVM::default());
    alloc::bench(c);
    collect::bench(c);
}
