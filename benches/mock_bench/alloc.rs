use criterion::Criterion;

use gengc::memory_manager;
use gengc::util::options::GcType;
use gengc::util::test_util::fixtures::*;

pub fn bench(c: &mut Criterion) {
    // Nothing survives, so the young space is reset by the occasional young collection.
    let fixture = MutatorFixture::create(GcType::GenGc);
    c.bench_function("alloc_young", |b| {
        b.iter(|| memory_manager::alloc(fixture.mutator(), TEST_CLASS, 2, 16))
    });

    let fixture = MutatorFixture::create(GcType::Stw);
    c.bench_function("alloc_tenured", |b| {
        b.iter(|| memory_manager::alloc(fixture.mutator(), TEST_CLASS, 2, 16))
    });
}
