use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use marrow::runtime::CELL_HEADER_BYTES;
use marrow::{
    ClassDescriptor, CollectStats, EngineObject, Heap, HeapConfig, HeapStats, ObjectCore,
    ObjectHandle,
};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum ReportFormatArg {
    #[default]
    Human,
    Json,
}

#[derive(Parser)]
#[command(name = "marrow")]
#[command(about = "Engine memory core diagnostics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic allocation/collection workload
    Stress {
        /// Objects allocated per generation
        #[arg(long, default_value = "1000")]
        objects: usize,

        /// Generations of allocate/collect churn
        #[arg(long, default_value = "10")]
        generations: usize,

        /// Percentage of objects rooted per generation
        #[arg(long, default_value = "10")]
        rooted_percent: u64,

        /// Outgoing links per object
        #[arg(long, default_value = "2")]
        links: usize,

        /// Heap configuration file (heap.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print a summary line after each collection pass
        #[arg(long)]
        gc_stats: bool,

        /// Report format (human, json)
        #[arg(long, value_enum, default_value = "human")]
        format: ReportFormatArg,
    },
    /// Print the resolved size-class catalogue for a configuration
    Classes {
        /// Heap configuration file (heap.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// =============================================================================
// Stress workload
// =============================================================================

/// Heap object used by the stress workload: a payload plus outgoing links.
#[derive(Default)]
struct StressNode {
    core: ObjectCore,
    links: Vec<ObjectHandle>,
    _payload: [u8; 32],
}

impl EngineObject for StressNode {
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

fn stress_class() -> Arc<ClassDescriptor> {
    Arc::new(
        ClassDescriptor::object("StressNode", 96, 8)
            .with_construct(|| Box::new(StressNode::default())),
    )
}

/// Small deterministic generator (xorshift64) so runs are reproducible.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[derive(Serialize)]
struct StressReport {
    generations: usize,
    objects_per_generation: usize,
    heap: HeapStats,
    collector: CollectStats,
}

fn run_stress(
    objects: usize,
    generations: usize,
    rooted_percent: u64,
    links: usize,
    config: HeapConfig,
    format: ReportFormatArg,
) -> Result<(), String> {
    let mut heap = Heap::new(config)?;
    let class = stress_class();
    let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
    let mut roots: Vec<ObjectHandle> = Vec::new();

    for generation in 0..generations {
        // The previous generation's roots go stale this round.
        for root in roots.drain(..) {
            heap.set_keep_alive(&root, false);
        }

        let mut handles: Vec<ObjectHandle> = Vec::with_capacity(objects);
        for i in 0..objects {
            let handle = heap.allocate(&class, &format!("stress.g{}.n{}", generation, i), None);
            if handle.is_null() {
                return Err("failed to allocate stress object".to_string());
            }
            for _ in 0..links.min(handles.len()) {
                let target = handles[(rng.next() as usize) % handles.len()];
                let node = heap
                    .resolve_as_mut::<StressNode>(&handle)
                    .expect("fresh handle resolves");
                node.links.push(target);
            }
            if rng.next() % 100 < rooted_percent {
                heap.set_keep_alive(&handle, true);
                roots.push(handle);
            }
            handles.push(handle);
        }

        heap.collect_garbage();
    }

    let report = StressReport {
        generations,
        objects_per_generation: objects,
        heap: heap.stats(),
        collector: heap.collect_stats().clone(),
    };

    match format {
        ReportFormatArg::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("failed to serialize report: {}", e))?;
            println!("{}", json);
        }
        ReportFormatArg::Human => {
            println!(
                "stress: {} generations x {} objects, {} still live",
                report.generations, report.objects_per_generation, report.heap.objects_live
            );
            println!(
                "collector: {} cycles, {} reclaimed, max pause {}us, total pause {}us",
                report.collector.cycles,
                report.collector.objects_reclaimed,
                report.collector.max_pause_us,
                report.collector.total_pause_us
            );
            for class in &report.heap.size_classes {
                println!(
                    "  class {:>5}B: {} blocks, {}/{} cells live",
                    class.cell_size, class.blocks, class.cells_live, class.cells_total
                );
            }
        }
    }
    Ok(())
}

fn run_classes(config: HeapConfig) -> Result<(), String> {
    println!("block budget: {} bytes", config.block_bytes);
    println!("{:>10} {:>10} {:>12}", "cell", "payload", "cells/block");
    for &cell_size in &config.size_classes {
        println!(
            "{:>10} {:>10} {:>12}",
            cell_size,
            cell_size - CELL_HEADER_BYTES,
            config.block_bytes / cell_size
        );
    }
    Ok(())
}

fn load_config(path: Option<&Path>, gc_stats: bool) -> Result<HeapConfig, String> {
    let mut config = match path {
        Some(path) => HeapConfig::load(path)?,
        None => HeapConfig::default(),
    };
    config.gc_stats = config.gc_stats || gc_stats;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stress {
            objects,
            generations,
            rooted_percent,
            links,
            config,
            gc_stats,
            format,
        } => load_config(config.as_deref(), gc_stats).and_then(|config| {
            run_stress(objects, generations, rooted_percent, links, config, format)
        }),
        Commands::Classes { config } => load_config(config.as_deref(), false).and_then(run_classes),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
