//! Class descriptors consumed from the reflection collaborator.
//!
//! The heap does not own the type model; it only reads what it needs from a
//! descriptor: instance size and alignment for size-class selection, the
//! abstract flag and factory for allocation checks, and the declared ancestry
//! for the required-parent attribute.

use std::fmt;

use super::object::EngineObject;

/// Factory producing a default-constructed engine object of the class.
pub type ConstructFn = fn() -> Box<dyn EngineObject>;

/// Whether a class describes heap-managed engine objects or plain values.
/// Only object classes may be allocated on the engine heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Object,
    Value,
}

/// Per-class metadata supplied by the reflection system.
pub struct ClassDescriptor {
    name: String,
    kind: ClassKind,
    instance_size: usize,
    align: usize,
    is_abstract: bool,
    ancestors: Vec<String>,
    required_parent: Option<String>,
    construct: Option<ConstructFn>,
}

impl ClassDescriptor {
    /// Describe a concrete object class.
    pub fn object(name: &str, instance_size: usize, align: usize) -> Self {
        ClassDescriptor {
            name: name.to_string(),
            kind: ClassKind::Object,
            instance_size,
            align,
            is_abstract: false,
            ancestors: Vec::new(),
            required_parent: None,
            construct: None,
        }
    }

    /// Describe a plain value class (not heap-allocatable).
    pub fn value(name: &str, instance_size: usize, align: usize) -> Self {
        ClassDescriptor {
            kind: ClassKind::Value,
            ..ClassDescriptor::object(name, instance_size, align)
        }
    }

    /// Mark the class abstract: instances can never be allocated.
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_construct(mut self, construct: ConstructFn) -> Self {
        self.construct = Some(construct);
        self
    }

    /// Declare the class's ancestor chain, nearest first.
    pub fn with_ancestors(mut self, ancestors: &[&str]) -> Self {
        self.ancestors = ancestors.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Require that allocations supply a parent object whose class declares
    /// the named ancestor.
    pub fn with_required_parent(mut self, ancestor: &str) -> Self {
        self.required_parent = Some(ancestor.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn required_parent(&self) -> Option<&str> {
        self.required_parent.as_deref()
    }

    pub fn construct(&self) -> Option<ConstructFn> {
        self.construct
    }

    /// Whether the class is, or descends from, the named class.
    pub fn declares_ancestor(&self, name: &str) -> bool {
        self.name == name || self.ancestors.iter().any(|a| a == name)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("instance_size", &self.instance_size)
            .field("align", &self.align)
            .field("is_abstract", &self.is_abstract)
            .field("ancestors", &self.ancestors)
            .field("required_parent", &self.required_parent)
            .field("has_construct", &self.construct.is_some())
            .finish()
    }
}
