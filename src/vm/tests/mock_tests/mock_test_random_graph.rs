// Random mutations of an object graph, checked against a shadow copy of the graph after
// every collection. Objects move, so the shadow graph refers to nodes by index and the
// addresses of the nodes are rediscovered from the roots.

use super::mock_test_prelude::*;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashSet, VecDeque};

const FIELDS: usize = 3;
const STEPS: usize = 2000;

#[derive(Default)]
struct ShadowGraph {
    nodes: Vec<[Option<usize>; FIELDS]>,
    /// In the order of the mock stack roots.
    roots: Vec<usize>,
}

#[derive(Default)]
struct Walk {
    addresses: BTreeMap<usize, ObjectReference>,
    objects: HashSet<ObjectReference>,
    queue: VecDeque<(usize, ObjectReference)>,
}

impl Walk {
    fn visit(&mut self, node: usize, object: ObjectReference) {
        match self.addresses.get(&node) {
            Some(known) => assert_eq!(*known, object, "node {} has two addresses", node),
            None => {
                assert!(self.objects.insert(object), "{} is shared by two nodes", object);
                self.addresses.insert(node, object);
                self.queue.push_back((node, object));
            }
        }
    }
}

struct RandomGraph {
    fixture: MutatorFixture,
    shadow: ShadowGraph,
    /// Addresses of the nodes known to be in the heap.
    addresses: BTreeMap<usize, ObjectReference>,
    gc_count: u64,
    rng: ChaCha8Rng,
}

impl RandomGraph {
    fn new(gc_type: GcType, seed: u64) -> Self {
        RandomGraph {
            fixture: MutatorFixture::create(gc_type),
            shadow: ShadowGraph::default(),
            addresses: BTreeMap::new(),
            gc_count: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn is_generational(&self) -> bool {
        self.fixture.heap().options().gc_type == GcType::GenGc
    }

    /// Walk the shadow graph and the heap side by side, check that they have the same shape,
    /// and record the current address of every reachable node.
    fn sync(&mut self) {
        let roots = mock_runtime::stack_roots();
        assert_eq!(roots.len(), self.shadow.roots.len());

        let mut walk = Walk::default();
        for (node, object) in self.shadow.roots.iter().zip(roots) {
            walk.visit(*node, object);
        }
        while let Some((node, object)) = walk.queue.pop_front() {
            assert!(self.fixture.is_live(object), "node {} at {} is dead", node, object);
            for (index, expected) in self.shadow.nodes[node].iter().enumerate() {
                match (expected, self.fixture.read(object, index)) {
                    (None, None) => {}
                    (Some(target), Some(actual)) => walk.visit(*target, actual),
                    (expected, actual) => panic!(
                        "node {} field {}: expected node {:?}, found {:?}",
                        node, index, expected, actual
                    ),
                }
            }
        }

        self.addresses = walk.addresses;
        self.gc_count = memory_manager::gc_count(self.fixture.heap());
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[self.rng.random_range(0..items.len())])
        }
    }

    fn allocate(&mut self) {
        let object = if self.rng.random_bool(0.8) {
            self.fixture.alloc(FIELDS)
        } else {
            self.fixture.alloc_tenured(FIELDS)
        };
        let node = self.shadow.nodes.len();
        self.shadow.nodes.push([None; FIELDS]);
        self.shadow.roots.push(node);
        mock_runtime::add_stack_root(object);
        if memory_manager::gc_count(self.fixture.heap()) != self.gc_count {
            // The allocation collected and the old addresses are stale.
            self.sync();
        } else {
            self.addresses.insert(node, object);
        }
    }

    fn write(&mut self) {
        let nodes: Vec<usize> = self.addresses.keys().copied().collect();
        let Some(src) = self.pick(&nodes) else {
            return;
        };
        let index = self.rng.random_range(0..FIELDS);
        let target = if self.rng.random_bool(0.2) {
            None
        } else {
            self.pick(&nodes)
        };
        self.fixture.write(
            self.addresses[&src],
            index,
            target.map(|t| self.addresses[&t]),
        );
        self.shadow.nodes[src][index] = target;
    }

    fn unroot(&mut self) {
        if self.shadow.roots.is_empty() {
            return;
        }
        let index = self.rng.random_range(0..self.shadow.roots.len());
        let object = mock_runtime::stack_roots()[index];
        assert!(mock_runtime::remove_stack_root(object));
        self.shadow.roots.remove(index);
    }

    fn collect(&mut self, cause: GCTaskCause) {
        memory_manager::request_collection(self.fixture.heap(), cause, Some(self.fixture.mutator()));
        self.sync();
        assert_eq!(self.fixture.verify(), 0);
        if cause == GCTaskCause::Explicit {
            // Only reachable objects are left after a full collection.
            assert_eq!(
                self.fixture.heap().allocator().object_count(),
                self.addresses.len()
            );
        }
    }

    fn run(&mut self) {
        for _ in 0..STEPS {
            match self.rng.random_range(0..100) {
                0..=39 => self.allocate(),
                40..=74 => self.write(),
                75..=94 => self.unroot(),
                _ => {
                    let cause = if self.is_generational() && self.rng.random_bool(0.5) {
                        GCTaskCause::YoungGc
                    } else {
                        GCTaskCause::Explicit
                    };
                    self.collect(cause);
                }
            }
        }
        self.collect(GCTaskCause::Explicit);
        info!(
            "Random graph: {} nodes, {} reachable after {} collections",
            self.shadow.nodes.len(),
            self.addresses.len(),
            self.gc_count
        );
    }
}

fn random_graph(gc_type: GcType) {
    for seed in [1, 42, 2024] {
        with_mockvm(
            default_setup,
            || RandomGraph::new(gc_type, seed).run(),
            no_cleanup,
        )
    }
}

#[test]
pub fn random_graph_gen_gc() {
    random_graph(GcType::GenGc)
}

#[test]
pub fn random_graph_stw() {
    random_graph(GcType::Stw)
}
