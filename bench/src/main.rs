//! Workload timings for the engine heap, emitted as JSON.

use marrow::{ClassDescriptor, EngineObject, Heap, HeapConfig, ObjectCore, ObjectHandle};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

#[derive(Serialize)]
struct BenchmarkResult {
    name: String,
    secs: f64,
    objects_allocated: usize,
    objects_reclaimed: usize,
}

#[derive(Serialize)]
struct BenchmarkOutput {
    results: Vec<BenchmarkResult>,
}

#[derive(Default)]
struct Node {
    core: ObjectCore,
    links: Vec<ObjectHandle>,
}

impl EngineObject for Node {
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

fn node_class() -> Arc<ClassDescriptor> {
    Arc::new(ClassDescriptor::object("Node", 64, 8).with_construct(|| Box::new(Node::default())))
}

/// Allocate-and-discard churn: every generation is garbage by the next pass.
fn churn_workload(generations: usize, per_generation: usize) -> BenchmarkResult {
    let class = node_class();
    let mut heap = Heap::new(HeapConfig::default()).unwrap();

    let start = Instant::now();
    for generation in 0..generations {
        for i in 0..per_generation {
            heap.allocate(&class, &format!("churn.g{}.n{}", generation, i), None);
        }
        heap.collect_garbage();
    }
    let secs = start.elapsed().as_secs_f64();

    BenchmarkResult {
        name: "churn".to_string(),
        secs,
        objects_allocated: generations * per_generation,
        objects_reclaimed: heap.collect_stats().objects_reclaimed,
    }
}

/// One rooted chain: collection rescues every node through traversal.
fn chain_workload(length: usize, passes: usize) -> BenchmarkResult {
    let class = node_class();
    let mut heap = Heap::new(HeapConfig::default()).unwrap();

    let root = heap.allocate(&class, "chain.0", None);
    heap.set_keep_alive(&root, true);
    let mut prev = root;
    for i in 1..length {
        let node = heap.allocate(&class, &format!("chain.{}", i), None);
        heap.resolve_as_mut::<Node>(&prev).unwrap().links.push(node);
        prev = node;
    }

    let start = Instant::now();
    for _ in 0..passes {
        heap.collect_garbage();
    }
    let secs = start.elapsed().as_secs_f64();

    BenchmarkResult {
        name: "chain_rescue".to_string(),
        secs,
        objects_allocated: length,
        objects_reclaimed: heap.collect_stats().objects_reclaimed,
    }
}

/// Shared handle churn: clone/drop traffic on one resource block.
fn shared_workload(iterations: usize) -> BenchmarkResult {
    let shared = marrow::Shared::new_combined(vec![0u8; 256]);

    let start = Instant::now();
    for _ in 0..iterations {
        let clone = shared.clone();
        let weak = clone.downgrade();
        std::hint::black_box(weak.upgrade());
    }
    let secs = start.elapsed().as_secs_f64();

    BenchmarkResult {
        name: "shared_clone_upgrade".to_string(),
        secs,
        objects_allocated: 1,
        objects_reclaimed: 0,
    }
}

fn main() {
    let results = vec![
        churn_workload(50, 2000),
        chain_workload(10_000, 20),
        shared_workload(1_000_000),
    ];

    let output = BenchmarkOutput { results };
    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}
