//! Heap benchmarks: allocation throughput and collection cost.

use std::any::Any;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use marrow::{ClassDescriptor, EngineObject, Heap, HeapConfig, ObjectCore, ObjectHandle};

#[derive(Default)]
struct BenchNode {
    core: ObjectCore,
    links: Vec<ObjectHandle>,
}

impl EngineObject for BenchNode {
    fn core(&self) -> &ObjectCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn visit_references(&self, visit: &mut dyn FnMut(&ObjectHandle)) {
        for link in &self.links {
            visit(link);
        }
    }
}

fn bench_class() -> Arc<ClassDescriptor> {
    Arc::new(
        ClassDescriptor::object("BenchNode", 64, 8)
            .with_construct(|| Box::new(BenchNode::default())),
    )
}

fn bench_allocation(c: &mut Criterion) {
    let class = bench_class();
    c.bench_function("allocate_1000", |b| {
        b.iter(|| {
            let mut heap = Heap::with_defaults();
            for i in 0..1000 {
                black_box(heap.allocate(&class, &format!("n{}", i), None));
            }
            heap
        });
    });
}

fn bench_collection(c: &mut Criterion) {
    let class = bench_class();
    let mut group = c.benchmark_group("collect");
    for &count in &[100usize, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("unreachable", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut heap = Heap::with_defaults();
                    for i in 0..count {
                        heap.allocate(&class, &format!("n{}", i), None);
                    }
                    heap
                },
                |mut heap| {
                    black_box(heap.collect_garbage());
                    heap
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_chain_traversal(c: &mut Criterion) {
    let class = bench_class();
    c.bench_function("collect_chain_1000", |b| {
        b.iter_batched(
            || {
                // One rooted chain of 1000 nodes: collection must rescue all
                // of them through the traversal hooks.
                let mut heap = Heap::with_defaults();
                let root = heap.allocate(&class, "n0", None);
                heap.set_keep_alive(&root, true);
                let mut prev = root;
                for i in 1..1000 {
                    let node = heap.allocate(&class, &format!("n{}", i), None);
                    heap.resolve_as_mut::<BenchNode>(&prev)
                        .unwrap()
                        .links
                        .push(node);
                    prev = node;
                }
                heap
            },
            |mut heap| {
                black_box(heap.collect_garbage());
                heap
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_allocation,
    bench_collection,
    bench_chain_traversal
);
criterion_main!(benches);
