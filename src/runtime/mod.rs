mod class;
mod collect;
mod handle;
mod heap;
mod object;
mod resource;

pub use class::{ClassDescriptor, ClassKind, ConstructFn};
pub use collect::CollectStats;
pub use handle::{ObjectHandle, WeakObjectHandle};
pub use heap::{CELL_HEADER_BYTES, Heap, HeapStats, SizeClassStats};
pub use object::{EngineObject, ObjectCore, identity_hash_of};
pub use resource::{AllocStrategy, ResourceBlock, SelfHandle, SelfSlot, Shared, WeakShared};
