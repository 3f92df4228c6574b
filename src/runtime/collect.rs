//! Mark-and-sweep collection over the engine heap.
//!
//! One synchronous, stop-the-world pass comprising three full heap walks:
//! mark everything not rooted, unmark everything reachable from a root via
//! the objects' traversal hooks, then gather what is still marked and destroy
//! it newest-first. Teardown reuses the same descending destruction order
//! without any marking.

use std::time::Instant;

use serde::Serialize;

use super::handle::CellAddr;
use super::heap::Heap;

/// Accumulated collection statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectStats {
    /// Completed collection passes.
    pub cycles: usize,
    /// Objects reclaimed across all passes.
    pub objects_reclaimed: usize,
    /// Objects reclaimed by the most recent pass.
    pub last_reclaimed: usize,
    /// Duration of the most recent pass, in microseconds.
    pub last_pause_us: u64,
    pub max_pause_us: u64,
    pub total_pause_us: u64,
}

impl Heap {
    /// Run one full collection pass. Returns the number of objects
    /// reclaimed.
    ///
    /// Everything transitively reachable from a `keep_alive` object survives;
    /// everything else is destroyed, newest allocation first.
    pub fn collect_garbage(&mut self) -> usize {
        let start = Instant::now();

        let candidates = self.mark_all();
        self.unmark_reachable();
        let reclaimed = if self.pending_delete > 0 {
            self.gather_and_delete()
        } else {
            0
        };
        debug_assert_eq!(self.pending_delete, 0);

        let pause_us = start.elapsed().as_micros() as u64;
        self.collect_stats.cycles += 1;
        self.collect_stats.objects_reclaimed += reclaimed;
        self.collect_stats.last_reclaimed = reclaimed;
        self.collect_stats.last_pause_us = pause_us;
        self.collect_stats.max_pause_us = self.collect_stats.max_pause_us.max(pause_us);
        self.collect_stats.total_pause_us += pause_us;

        if self.config().gc_stats {
            eprintln!(
                "[GC] {} candidates, {} reclaimed, {} live, {}us",
                candidates,
                reclaimed,
                self.object_count(),
                pause_us
            );
        }
        log::trace!(
            "collect: {} candidates, {} reclaimed, {} live",
            candidates,
            reclaimed,
            self.object_count()
        );
        reclaimed
    }

    /// Destroy every live object unconditionally, newest allocation first.
    /// Used for heap shutdown; idempotent.
    pub fn tear_down(&mut self) -> usize {
        let mut doomed: Vec<(u64, CellAddr)> = Vec::new();
        self.for_each_live_cell(|addr, cell| {
            doomed.push((cell.header.allocated_at(), addr));
        });
        doomed.sort_by(|a, b| b.0.cmp(&a.0));
        let count = doomed.len();
        for (_, addr) in doomed {
            self.free_cell(addr);
        }
        if count > 0 {
            log::trace!("tear_down: destroyed {} objects", count);
        }
        count
    }

    /// Pass 1: flag every non-rooted live object for deletion and clear the
    /// visited flag on all of them. Returns the number of candidates.
    fn mark_all(&mut self) -> usize {
        let mut pending = 0;
        self.for_each_live_cell_mut(|_, cell| {
            cell.flags.visited_this_pass = false;
            if !cell.flags.keep_alive {
                cell.flags.marked_for_deletion = true;
                pending += 1;
            }
        });
        self.pending_delete = pending;
        pending
    }

    /// Pass 2: from each unvisited root, traverse the object graph through
    /// the traversal hooks and rescue everything reached.
    fn unmark_reachable(&mut self) {
        let mut roots = Vec::new();
        self.for_each_live_cell(|addr, cell| {
            if cell.flags.keep_alive {
                roots.push(addr);
            }
        });
        for root in roots {
            let visited = self
                .cell(root)
                .map(|cell| cell.flags.visited_this_pass)
                .unwrap_or(true);
            if !visited {
                self.visit_subtree(root, 0);
            }
        }
    }

    /// Visit one cell and recurse into its outgoing references. Traversal is
    /// plain call-stack recursion; `depth` tracks how far inside the root's
    /// subtree we are.
    fn visit_subtree(&mut self, addr: CellAddr, depth: usize) {
        let unmarked = {
            let Some(cell) = self.cell_mut(addr) else {
                return;
            };
            if !cell.header.is_live() || cell.flags.visited_this_pass {
                return;
            }
            cell.flags.visited_this_pass = true;
            if cell.flags.marked_for_deletion {
                cell.flags.marked_for_deletion = false;
                true
            } else {
                false
            }
        };
        if unmarked {
            self.pending_delete -= 1;
            log::trace!("rescued {:?} at depth {}", addr, depth);
        }

        for child in self.outgoing_refs(addr) {
            self.visit_subtree(child, depth + 1);
        }
    }

    /// The cell addresses of every still-valid reference the object reports
    /// through its traversal hook.
    fn outgoing_refs(&self, addr: CellAddr) -> Vec<CellAddr> {
        let Some(cell) = self.cell(addr) else {
            return Vec::new();
        };
        let Some(object) = cell.object.as_ref() else {
            return Vec::new();
        };
        let mut refs = Vec::new();
        object.visit_references(&mut |handle| {
            if let Some(child) = self.validate(handle.addr(), handle.identity_hash()) {
                refs.push(child);
            }
        });
        refs
    }

    /// Pass 3: gather everything still marked, sort by allocation clock
    /// descending, and free the cells in that order.
    fn gather_and_delete(&mut self) -> usize {
        let mut doomed: Vec<(u64, CellAddr)> = Vec::new();
        self.for_each_live_cell(|addr, cell| {
            if cell.flags.marked_for_deletion {
                doomed.push((cell.header.allocated_at(), addr));
            }
        });
        // Newest first: objects tend to depend on objects created before
        // them, so destructors see their dependencies still alive.
        doomed.sort_by(|a, b| b.0.cmp(&a.0));
        let count = doomed.len();
        for (_, addr) in doomed {
            self.free_cell(addr);
        }
        self.pending_delete = 0;
        count
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.tear_down();
    }
}
