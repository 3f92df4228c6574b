//! Marrow - the memory-ownership core of an engine runtime
//!
//! This library provides the intrusive reference-counted handles used for
//! shared heap values, and the size-segregated engine heap with its
//! mark-and-sweep collector and validated object handles.

pub mod config;
pub mod runtime;

// Re-export commonly used types
pub use config::HeapConfig;
pub use runtime::{
    ClassDescriptor, ClassKind, CollectStats, EngineObject, Heap, HeapStats, ObjectCore,
    ObjectHandle, Shared, WeakObjectHandle, WeakShared,
};
