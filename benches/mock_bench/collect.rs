use criterion::Criterion;

use gengc::memory_manager;
use gengc::util::options::GcType;
use gengc::util::test_util::fixtures::*;
use gengc::util::test_util::mock_vm::mock_runtime;
use gengc::GCTaskCause;

const OBJECTS: usize = 2000;

/// A rooted binary tree of tenured objects.
fn build_tree(fixture: &MutatorFixture) {
    let nodes: Vec<_> = (0..OBJECTS).map(|_| fixture.alloc_tenured(2)).collect();
    for (i, node) in nodes.iter().enumerate() {
        for (field, child) in [2 * i + 1, 2 * i + 2].into_iter().enumerate() {
            if let Some(child) = nodes.get(child) {
                fixture.write(*node, field, Some(*child));
            }
        }
    }
    mock_runtime::add_stack_root(nodes[0]);
}

pub fn bench(c: &mut Criterion) {
    for gc_type in [GcType::GenGc, GcType::Stw] {
        mock_runtime::reset();
        let fixture = MutatorFixture::create(gc_type);
        build_tree(&fixture);
        c.bench_function(&format!("full_gc_{:?}", gc_type), |b| {
            b.iter(|| fixture.collect())
        });
    }

    mock_runtime::reset();
    let fixture = MutatorFixture::create(GcType::GenGc);
    build_tree(&fixture);
    c.bench_function("young_gc", |b| {
        b.iter(|| {
            for _ in 0..100 {
                fixture.alloc(2);
            }
            memory_manager::request_collection(
                fixture.heap(),
                GCTaskCause::YoungGc,
                Some(fixture.mutator()),
            )
        })
    });
}
