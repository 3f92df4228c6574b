//! The size-segregated engine heap.
//!
//! The heap owns a fixed, ascending catalogue of cell-size classes. Each
//! class grows a list of fixed-budget blocks; each block is subdivided into
//! fixed-size cells threaded into a LIFO free list while vacant. A cell's
//! header is a typed state: `Free { next_free }` or `Live { allocated_at }`.
//! There is no separate occupancy bitmap and no third state.
//!
//! Allocation is descriptor-driven: the class descriptor's declared instance
//! size selects the smallest size class that accommodates it, and the
//! descriptor's factory produces the object placed in the cell. Fragmentation
//! is bounded by the fixed cell sizes rather than avoided; there is no
//! coalescing and no compaction.

use std::sync::Arc;

use serde::Serialize;

use crate::config::HeapConfig;

use super::class::{ClassDescriptor, ClassKind};
use super::collect::CollectStats;
use super::handle::{CellAddr, ObjectHandle, WeakObjectHandle};
use super::object::EngineObject;

// =============================================================================
// Cells and headers
// =============================================================================

/// Per-cell metadata. The state transition between the two variants is the
/// allocation/deallocation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellHeader {
    /// Vacant: links to the next free cell in the owning block.
    Free { next_free: Option<u32> },
    /// Occupied: stamped with the heap's allocation clock.
    Live { allocated_at: u64 },
}

impl CellHeader {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, CellHeader::Live { .. })
    }

    /// The allocation clock stamp. Zero for a free cell.
    pub(crate) fn allocated_at(&self) -> u64 {
        match self {
            CellHeader::Live { allocated_at } => *allocated_at,
            CellHeader::Free { .. } => 0,
        }
    }
}

/// Per-cell header overhead counted against the cell budget when selecting
/// a size class.
pub const CELL_HEADER_BYTES: usize = std::mem::size_of::<CellHeader>();

/// Heap-owned collection marks for one live cell. `keep_alive` is the sole
/// GC-root mechanism; the other two are only meaningful during a pass.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CellFlags {
    pub(crate) keep_alive: bool,
    pub(crate) marked_for_deletion: bool,
    pub(crate) visited_this_pass: bool,
}

pub(crate) struct Cell {
    pub(crate) header: CellHeader,
    pub(crate) flags: CellFlags,
    pub(crate) object: Option<Box<dyn EngineObject>>,
}

// =============================================================================
// Blocks and size classes
// =============================================================================

/// A fixed-budget arena subdivided into cells of one size class.
pub(crate) struct Block {
    cell_size: usize,
    cells: Vec<Cell>,
    free_head: Option<u32>,
}

impl Block {
    fn new(cell_size: usize, block_bytes: usize) -> Block {
        let capacity = (block_bytes / cell_size).max(1);
        let mut cells = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next_free = if i + 1 < capacity {
                Some(i as u32 + 1)
            } else {
                None
            };
            cells.push(Cell {
                header: CellHeader::Free { next_free },
                flags: CellFlags::default(),
                object: None,
            });
        }
        Block {
            cell_size,
            cells,
            free_head: Some(0),
        }
    }

    fn has_free_cell(&self) -> bool {
        self.free_head.is_some()
    }

    /// Pop the free-list head and mark it live with the given clock stamp.
    fn acquire(&mut self, clock: u64) -> Option<u32> {
        let idx = self.free_head?;
        let cell = &mut self.cells[idx as usize];
        let CellHeader::Free { next_free } = cell.header else {
            unreachable!("free-list head points at a live cell");
        };
        self.free_head = next_free;
        cell.header = CellHeader::Live {
            allocated_at: clock,
        };
        cell.flags = CellFlags::default();
        Some(idx)
    }

    /// Vacate a live cell and splice it back as the new free-list head
    /// (LIFO reuse). A block only ever releases cells it owns; the index is
    /// bounds-checked against its own cell array.
    fn release(&mut self, idx: u32) -> Box<dyn EngineObject> {
        let cell = &mut self.cells[idx as usize];
        debug_assert!(cell.header.is_live(), "releasing a vacant cell");
        let object = cell.object.take().expect("live cell without an object");
        cell.header = CellHeader::Free {
            next_free: self.free_head,
        };
        cell.flags = CellFlags::default();
        self.free_head = Some(idx);
        object
    }

    fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| c.header.is_live()).count()
    }
}

struct SizeClass {
    cell_size: usize,
    blocks: Vec<Block>,
}

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time heap occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct HeapStats {
    pub objects_live: usize,
    pub allocations_total: usize,
    pub size_classes: Vec<SizeClassStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SizeClassStats {
    pub cell_size: usize,
    pub blocks: usize,
    pub cells_total: usize,
    pub cells_live: usize,
    pub bytes_reserved: usize,
}

// =============================================================================
// Heap
// =============================================================================

/// The engine heap: size classes, blocks, cells, and collection state.
pub struct Heap {
    classes: Vec<SizeClass>,
    config: HeapConfig,
    /// Monotonic allocation clock stamped into live headers.
    clock: u64,
    live: usize,
    allocations: usize,
    /// Objects marked for deletion by the current collection pass.
    pub(crate) pending_delete: usize,
    pub(crate) collect_stats: CollectStats,
}

impl Heap {
    /// Create a heap from a validated configuration.
    pub fn new(config: HeapConfig) -> Result<Heap, String> {
        config.validate()?;
        for &cell_size in &config.size_classes {
            if cell_size <= CELL_HEADER_BYTES {
                return Err(format!(
                    "failed to configure heap: size class {} leaves no room past the {}-byte header",
                    cell_size, CELL_HEADER_BYTES
                ));
            }
        }
        let classes = config
            .size_classes
            .iter()
            .map(|&cell_size| SizeClass {
                cell_size,
                blocks: Vec::new(),
            })
            .collect();
        Ok(Heap {
            classes,
            config,
            clock: 0,
            live: 0,
            allocations: 0,
            pending_delete: 0,
            collect_stats: CollectStats::default(),
        })
    }

    /// Create a heap with the default size-class catalogue.
    pub fn with_defaults() -> Heap {
        Heap::new(HeapConfig::default()).expect("default heap config is valid")
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Number of live objects on the heap.
    pub fn object_count(&self) -> usize {
        self.live
    }

    /// Allocate, construct and name an object of the given class.
    ///
    /// Soft failures (non-object class, abstract class, class without a
    /// factory, missing or unsuitable parent) are logged and return the null
    /// handle. Requesting a size that exceeds every size class is a fatal
    /// configuration error.
    pub fn allocate(
        &mut self,
        class: &Arc<ClassDescriptor>,
        name: &str,
        parent: Option<&ObjectHandle>,
    ) -> ObjectHandle {
        if class.kind() != ClassKind::Object {
            log::warn!("allocate '{}': class '{}' is not an object class", name, class.name());
            return ObjectHandle::null();
        }
        if class.is_abstract() {
            log::warn!("allocate '{}': class '{}' is abstract", name, class.name());
            return ObjectHandle::null();
        }
        let Some(construct) = class.construct() else {
            log::warn!("allocate '{}': class '{}' has no construction function", name, class.name());
            return ObjectHandle::null();
        };

        let parent_ref = match (class.required_parent(), parent) {
            (Some(required), Some(handle)) => match self.resolve(handle) {
                Some(object) if object.core().is_a(required) => Some(handle.downgrade()),
                Some(object) => {
                    log::warn!(
                        "allocate '{}': parent class '{}' does not descend from '{}'",
                        name,
                        object.core().class().map(|c| c.name()).unwrap_or("?"),
                        required
                    );
                    return ObjectHandle::null();
                }
                None => {
                    log::warn!("allocate '{}': parent handle is stale", name);
                    return ObjectHandle::null();
                }
            },
            (Some(required), None) => {
                log::warn!(
                    "allocate '{}': class '{}' requires a parent descending from '{}'",
                    name,
                    class.name(),
                    required
                );
                return ObjectHandle::null();
            }
            (None, Some(handle)) => Some(handle.downgrade()),
            (None, None) => None,
        };

        let class_idx = self.choose_class(class.instance_size());
        let addr = self.acquire_cell(class_idx);

        let mut object = construct();
        {
            let core = object.core_mut();
            core.bind_class(Arc::clone(class));
            core.set_name(name);
            if let Some(parent_ref) = parent_ref {
                core.set_parent(parent_ref);
            }
        }
        object.on_created();
        let identity_hash = object.core().identity_hash();

        let cell = self.cell_mut(addr).expect("freshly acquired cell");
        debug_assert!(cell.object.is_none());
        cell.object = Some(object);

        self.live += 1;
        self.allocations += 1;
        log::trace!(
            "allocate '{}': class '{}' in {}-byte cell at {:?}",
            name,
            class.name(),
            self.classes[addr.class as usize].cell_size,
            addr
        );
        ObjectHandle::new(addr, identity_hash)
    }

    /// Smallest size class whose cell, minus header overhead, accommodates
    /// the request. Panics if none does: the catalogue is a build-time
    /// configuration and an oversized object class is a configuration error.
    fn choose_class(&self, requested_size: usize) -> usize {
        self.classes
            .iter()
            .position(|class| class.cell_size - CELL_HEADER_BYTES >= requested_size)
            .unwrap_or_else(|| {
                panic!(
                    "allocation of {} bytes exceeds every size class (largest cell holds {} bytes)",
                    requested_size,
                    self.classes.last().map(|c| c.cell_size - CELL_HEADER_BYTES).unwrap_or(0)
                )
            })
    }

    /// Take a free cell from the class, scanning blocks in creation order
    /// and growing the class with a new block when none has a vacancy.
    fn acquire_cell(&mut self, class_idx: usize) -> CellAddr {
        self.clock += 1;
        let clock = self.clock;
        let block_bytes = self.config.block_bytes;
        let class = &mut self.classes[class_idx];

        for (block_idx, block) in class.blocks.iter_mut().enumerate() {
            if block.has_free_cell() {
                let cell = block.acquire(clock).expect("non-empty free list");
                return CellAddr {
                    class: class_idx as u32,
                    block: block_idx as u32,
                    cell,
                };
            }
        }

        let mut block = Block::new(class.cell_size, block_bytes);
        let cell = block.acquire(clock).expect("fresh block has a free cell");
        class.blocks.push(block);
        CellAddr {
            class: class_idx as u32,
            block: (class.blocks.len() - 1) as u32,
            cell,
        }
    }

    /// Vacate a cell: run the object's pre-destruction hook, drop it, and
    /// splice the header back onto its block's free list.
    pub(crate) fn free_cell(&mut self, addr: CellAddr) {
        let block = &mut self.classes[addr.class as usize].blocks[addr.block as usize];
        let mut object = block.release(addr.cell);
        object.on_destroy();
        drop(object);
        self.live -= 1;
        log::trace!("free cell {:?}", addr);
    }

    // -------------------------------------------------------------------------
    // Handle validation and resolution
    // -------------------------------------------------------------------------

    pub(crate) fn cell(&self, addr: CellAddr) -> Option<&Cell> {
        self.classes
            .get(addr.class as usize)?
            .blocks
            .get(addr.block as usize)?
            .cells
            .get(addr.cell as usize)
    }

    pub(crate) fn cell_mut(&mut self, addr: CellAddr) -> Option<&mut Cell> {
        self.classes
            .get_mut(addr.class as usize)?
            .blocks
            .get_mut(addr.block as usize)?
            .cells
            .get_mut(addr.cell as usize)
    }

    /// Check a stored address + identity-hash snapshot against the current
    /// cell occupant. Absent when the cell is vacant or was reused.
    pub(crate) fn validate(
        &self,
        addr: Option<CellAddr>,
        identity_hash: u64,
    ) -> Option<CellAddr> {
        let addr = addr?;
        let cell = self.cell(addr)?;
        if !cell.header.is_live() {
            return None;
        }
        let object = cell.object.as_ref()?;
        if identity_hash != 0 && object.core().identity_hash() == identity_hash {
            Some(addr)
        } else {
            None
        }
    }

    /// Resolve a strong-flavored handle to the live object, or absent if the
    /// cell was freed or reused. Stale resolution is expected, not an error.
    pub fn resolve(&self, handle: &ObjectHandle) -> Option<&dyn EngineObject> {
        let addr = self.validate(handle.addr(), handle.identity_hash())?;
        self.cell(addr)?.object.as_deref()
    }

    pub fn resolve_mut(&mut self, handle: &ObjectHandle) -> Option<&mut dyn EngineObject> {
        let addr = self.validate(handle.addr(), handle.identity_hash())?;
        self.cell_mut(addr)?.object.as_deref_mut()
    }

    /// Resolve a weak-flavored handle. Identical mechanics to [`resolve`];
    /// the flavor records intent only.
    ///
    /// [`resolve`]: Heap::resolve
    pub fn resolve_weak(&self, handle: &WeakObjectHandle) -> Option<&dyn EngineObject> {
        let addr = self.validate(handle.addr(), handle.identity_hash())?;
        self.cell(addr)?.object.as_deref()
    }

    pub fn resolve_weak_mut(&mut self, handle: &WeakObjectHandle) -> Option<&mut dyn EngineObject> {
        let addr = self.validate(handle.addr(), handle.identity_hash())?;
        self.cell_mut(addr)?.object.as_deref_mut()
    }

    /// Look a live object up by its unique name. Linear over all live cells;
    /// a diagnostics and wiring convenience, not a hot path.
    pub fn find_named(&self, name: &str) -> ObjectHandle {
        let mut found = ObjectHandle::null();
        self.for_each_live_cell(|addr, cell| {
            if found.is_null()
                && let Some(object) = cell.object.as_ref()
                && object.core().name() == Some(name)
            {
                found = ObjectHandle::new(addr, object.core().identity_hash());
            }
        });
        found
    }

    /// Resolve and downcast to a concrete object type.
    pub fn resolve_as<T: EngineObject>(&self, handle: &ObjectHandle) -> Option<&T> {
        self.resolve(handle)?.as_any().downcast_ref::<T>()
    }

    pub fn resolve_as_mut<T: EngineObject>(&mut self, handle: &ObjectHandle) -> Option<&mut T> {
        self.resolve_mut(handle)?.as_any_mut().downcast_mut::<T>()
    }

    // -------------------------------------------------------------------------
    // Roots
    // -------------------------------------------------------------------------

    /// Set or clear the target's root flag. Returns false if the handle is
    /// stale.
    pub fn set_keep_alive(&mut self, handle: &ObjectHandle, value: bool) -> bool {
        let Some(addr) = self.validate(handle.addr(), handle.identity_hash()) else {
            return false;
        };
        let cell = self.cell_mut(addr).expect("validated address");
        cell.flags.keep_alive = value;
        true
    }

    /// The target's root flag; false for a stale handle.
    pub fn keep_alive(&self, handle: &ObjectHandle) -> bool {
        self.validate(handle.addr(), handle.identity_hash())
            .and_then(|addr| self.cell(addr))
            .map(|cell| cell.flags.keep_alive)
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Enumeration and statistics
    // -------------------------------------------------------------------------

    /// Visit every live cell, in class/block/cell order.
    pub(crate) fn for_each_live_cell(&self, mut f: impl FnMut(CellAddr, &Cell)) {
        for (class_idx, class) in self.classes.iter().enumerate() {
            for (block_idx, block) in class.blocks.iter().enumerate() {
                for (cell_idx, cell) in block.cells.iter().enumerate() {
                    if cell.header.is_live() {
                        let addr = CellAddr {
                            class: class_idx as u32,
                            block: block_idx as u32,
                            cell: cell_idx as u32,
                        };
                        f(addr, cell);
                    }
                }
            }
        }
    }

    pub(crate) fn for_each_live_cell_mut(&mut self, mut f: impl FnMut(CellAddr, &mut Cell)) {
        for (class_idx, class) in self.classes.iter_mut().enumerate() {
            for (block_idx, block) in class.blocks.iter_mut().enumerate() {
                for (cell_idx, cell) in block.cells.iter_mut().enumerate() {
                    if cell.header.is_live() {
                        let addr = CellAddr {
                            class: class_idx as u32,
                            block: block_idx as u32,
                            cell: cell_idx as u32,
                        };
                        f(addr, cell);
                    }
                }
            }
        }
    }

    /// Fresh validated handles to every live object, in heap order.
    pub fn live_objects(&self) -> Vec<ObjectHandle> {
        let mut handles = Vec::with_capacity(self.live);
        self.for_each_live_cell(|addr, cell| {
            if let Some(object) = cell.object.as_ref() {
                handles.push(ObjectHandle::new(addr, object.core().identity_hash()));
            }
        });
        handles
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            objects_live: self.live,
            allocations_total: self.allocations,
            size_classes: self
                .classes
                .iter()
                .map(|class| SizeClassStats {
                    cell_size: class.cell_size,
                    blocks: class.blocks.len(),
                    cells_total: class.blocks.iter().map(|b| b.cells.len()).sum(),
                    cells_live: class.blocks.iter().map(|b| b.live_count()).sum(),
                    bytes_reserved: class
                        .blocks
                        .iter()
                        .map(|b| b.cells.len() * b.cell_size)
                        .sum(),
                })
                .collect(),
        }
    }

    pub fn collect_stats(&self) -> &CollectStats {
        &self.collect_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::object::ObjectCore;
    use std::any::Any;

    #[derive(Default)]
    struct Plain {
        core: ObjectCore,
    }

    impl EngineObject for Plain {
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
    }

    fn plain_class(name: &str, size: usize) -> Arc<ClassDescriptor> {
        Arc::new(
            ClassDescriptor::object(name, size, 8).with_construct(|| Box::new(Plain::default())),
        )
    }

    fn small_heap() -> Heap {
        let config = HeapConfig {
            size_classes: vec![128, 256, 512],
            block_bytes: 1024,
            gc_stats: false,
        };
        Heap::new(config).unwrap()
    }

    #[test]
    fn test_allocate_and_resolve_round_trip() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        let handle = heap.allocate(&class, "node.a", None);
        assert!(!handle.is_null());

        let object = heap.resolve(&handle).expect("fresh handle resolves");
        assert_eq!(object.core().name(), Some("node.a"));
        assert_eq!(object.core().identity_hash(), handle.identity_hash());
        assert_eq!(heap.object_count(), 1);
    }

    #[test]
    fn test_size_class_selection() {
        let mut heap = small_heap();
        // 40 bytes fits the 128-byte class; 200 bytes needs 256; 300 needs 512.
        let a = heap.allocate(&plain_class("A", 40), "a", None);
        let b = heap.allocate(&plain_class("B", 200), "b", None);
        let c = heap.allocate(&plain_class("C", 300), "c", None);
        assert!(!a.is_null() && !b.is_null() && !c.is_null());

        let stats = heap.stats();
        assert_eq!(stats.size_classes[0].cells_live, 1);
        assert_eq!(stats.size_classes[1].cells_live, 1);
        assert_eq!(stats.size_classes[2].cells_live, 1);
    }

    #[test]
    fn test_boundary_rounds_up_past_header() {
        let mut heap = small_heap();
        // Exactly cell_size - header fits; one byte more spills to the next class.
        let fits = heap.allocate(&plain_class("Fit", 128 - CELL_HEADER_BYTES), "fit", None);
        let spills = heap.allocate(&plain_class("Spill", 128 - CELL_HEADER_BYTES + 1), "spill", None);
        assert!(!fits.is_null() && !spills.is_null());
        let stats = heap.stats();
        assert_eq!(stats.size_classes[0].cells_live, 1);
        assert_eq!(stats.size_classes[1].cells_live, 1);
    }

    #[test]
    #[should_panic(expected = "exceeds every size class")]
    fn test_oversized_allocation_panics() {
        let mut heap = small_heap();
        heap.allocate(&plain_class("Huge", 4096), "huge", None);
    }

    #[test]
    fn test_block_growth_when_class_is_full() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        // 1024-byte blocks of 128-byte cells: 8 cells per block.
        for i in 0..9 {
            let handle = heap.allocate(&class, &format!("node.{}", i), None);
            assert!(!handle.is_null());
        }
        let stats = heap.stats();
        assert_eq!(stats.size_classes[0].blocks, 2);
        assert_eq!(stats.size_classes[0].cells_live, 9);
    }

    #[test]
    fn test_free_cell_lifo_reuse() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        let first = heap.allocate(&class, "first", None);
        let second = heap.allocate(&class, "second", None);

        let second_addr = second.addr().unwrap();
        heap.free_cell(second_addr);
        assert_eq!(heap.object_count(), 1);
        assert!(heap.resolve(&second).is_none());
        assert!(heap.resolve(&first).is_some());

        // LIFO: the vacated cell is handed out first.
        let third = heap.allocate(&class, "third", None);
        assert_eq!(third.addr().unwrap(), second_addr);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        let old = heap.allocate(&class, "old", None);
        heap.free_cell(old.addr().unwrap());

        // Same cell, different identity: the old snapshot must not match.
        let new = heap.allocate(&class, "new", None);
        assert_eq!(new.addr(), old.addr());
        assert!(heap.resolve(&old).is_none());
        assert!(heap.resolve(&new).is_some());
    }

    #[test]
    fn test_soft_failures_return_null_handles() {
        let mut heap = small_heap();

        let value_class = Arc::new(ClassDescriptor::value("Color", 16, 4));
        assert!(heap.allocate(&value_class, "c", None).is_null());

        let abstract_class = Arc::new(
            ClassDescriptor::object("Surface", 64, 8)
                .abstract_()
                .with_construct(|| Box::new(Plain::default())),
        );
        assert!(heap.allocate(&abstract_class, "s", None).is_null());

        let no_factory = Arc::new(ClassDescriptor::object("Opaque", 64, 8));
        assert!(heap.allocate(&no_factory, "o", None).is_null());

        assert_eq!(heap.object_count(), 0);
    }

    #[test]
    fn test_required_parent_checks() {
        let mut heap = small_heap();
        let window_class = Arc::new(
            ClassDescriptor::object("Window", 40, 8)
                .with_ancestors(&["Widget"])
                .with_construct(|| Box::new(Plain::default())),
        );
        let surface_class = Arc::new(
            ClassDescriptor::object("RenderSurface", 40, 8)
                .with_required_parent("Widget")
                .with_construct(|| Box::new(Plain::default())),
        );

        // Missing parent.
        assert!(heap.allocate(&surface_class, "surf.0", None).is_null());

        // Parent of the wrong lineage.
        let lone_class = plain_class("Lone", 40);
        let lone = heap.allocate(&lone_class, "lone", None);
        assert!(heap.allocate(&surface_class, "surf.1", Some(&lone)).is_null());

        // Satisfied ancestry; back-reference recorded.
        let window = heap.allocate(&window_class, "win", None);
        let surface = heap.allocate(&surface_class, "surf.2", Some(&window));
        assert!(!surface.is_null());
        let parent = heap
            .resolve(&surface)
            .unwrap()
            .core()
            .parent()
            .cloned()
            .unwrap();
        assert_eq!(
            heap.resolve_weak(&parent).unwrap().core().name(),
            Some("win")
        );
    }

    #[test]
    fn test_keep_alive_flag() {
        let mut heap = small_heap();
        let handle = heap.allocate(&plain_class("Node", 40), "n", None);
        assert!(!heap.keep_alive(&handle));
        assert!(heap.set_keep_alive(&handle, true));
        assert!(heap.keep_alive(&handle));

        heap.free_cell(handle.addr().unwrap());
        assert!(!heap.set_keep_alive(&handle, true));
        assert!(!heap.keep_alive(&handle));
    }

    #[test]
    fn test_resolve_as_downcast() {
        let mut heap = small_heap();
        let handle = heap.allocate(&plain_class("Node", 40), "n", None);
        assert!(heap.resolve_as::<Plain>(&handle).is_some());

        #[derive(Default)]
        struct Other {
            core: ObjectCore,
        }
        impl EngineObject for Other {
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
        }
        assert!(heap.resolve_as::<Other>(&handle).is_none());
    }

    #[test]
    fn test_live_objects_enumeration() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        let a = heap.allocate(&class, "a", None);
        let _b = heap.allocate(&class, "b", None);

        let live = heap.live_objects();
        assert_eq!(live.len(), 2);
        assert!(live.iter().any(|h| *h == a));
        for handle in &live {
            assert!(heap.resolve(handle).is_some());
        }
    }

    #[test]
    fn test_header_size_is_sixteen_bytes() {
        assert_eq!(CELL_HEADER_BYTES, 16);
    }

    #[test]
    fn test_find_named() {
        let mut heap = small_heap();
        let class = plain_class("Node", 40);
        let a = heap.allocate(&class, "scene.camera", None);
        let _b = heap.allocate(&class, "scene.light", None);

        assert_eq!(heap.find_named("scene.camera"), a);
        assert!(heap.find_named("scene.missing").is_null());

        heap.free_cell(a.addr().unwrap());
        assert!(heap.find_named("scene.camera").is_null());
    }

    #[test]
    fn test_reset_handle_resolves_absent() {
        let mut heap = small_heap();
        let mut handle = heap.allocate(&plain_class("Node", 40), "n", None);
        handle.reset();
        assert!(handle.is_null());
        assert!(heap.resolve(&handle).is_none());
        // Resetting the handle never touched the object itself.
        assert_eq!(heap.object_count(), 1);
    }
}
