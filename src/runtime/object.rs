//! The engine object trait and the per-object core state.
//!
//! Every heap-managed type embeds an [`ObjectCore`] and implements
//! [`EngineObject`]. The core carries identity (class binding, unique name,
//! identity hash) and the non-owning parent back-reference. Collection marks
//! are heap-owned cell flags, not object state.

use std::any::Any;
use std::sync::Arc;

use super::class::ClassDescriptor;
use super::handle::{ObjectHandle, WeakObjectHandle};

/// Implemented by every type stored on the engine heap.
///
/// `visit_references` is the collector's traversal hook: report every
/// outgoing strong reference the object holds. Parent back-references must
/// not be reported; they are non-owning. The lifecycle hooks run exactly
/// once each: `on_created` right after construction, `on_destroy` right
/// before the object's storage is reclaimed.
pub trait EngineObject: Any {
    fn core(&self) -> &ObjectCore;

    fn core_mut(&mut self) -> &mut ObjectCore;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Report every outgoing reference to the visitor.
    fn visit_references(&self, _visit: &mut dyn FnMut(&ObjectHandle)) {}

    fn on_created(&mut self) {}

    fn on_destroy(&mut self) {}
}

/// 64-bit FNV-1a over the object's name. The hash is the handle-validation
/// identity: names are unique at assignment, so distinct live objects never
/// share a hash.
pub fn identity_hash_of(name: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET_BASIS;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Identity and relationship state embedded in every engine object.
#[derive(Default)]
pub struct ObjectCore {
    class: Option<Arc<ClassDescriptor>>,
    name: Option<String>,
    identity_hash: u64,
    parent: Option<WeakObjectHandle>,
}

impl ObjectCore {
    pub fn new() -> Self {
        ObjectCore::default()
    }

    /// Bind the class descriptor. Done by the heap at allocation; binding
    /// twice is a programmer error.
    pub(crate) fn bind_class(&mut self, class: Arc<ClassDescriptor>) {
        assert!(self.class.is_none(), "object class is already bound");
        self.class = Some(class);
    }

    pub fn class(&self) -> Option<&Arc<ClassDescriptor>> {
        self.class.as_ref()
    }

    /// Assign the object's unique name and derive its identity hash.
    /// Naming an object twice is a programmer error.
    pub fn set_name(&mut self, name: &str) {
        assert!(
            self.name.is_none(),
            "object is already named '{}'",
            self.name.as_deref().unwrap_or_default()
        );
        self.identity_hash = identity_hash_of(name);
        self.name = Some(name.to_string());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The identity hash, or 0 while the object is unnamed.
    pub fn identity_hash(&self) -> u64 {
        self.identity_hash
    }

    /// Record the non-owning parent back-reference. Re-binding the parent is
    /// a programmer error.
    pub fn set_parent(&mut self, parent: WeakObjectHandle) {
        assert!(self.parent.is_none(), "object parent is already set");
        self.parent = Some(parent);
    }

    pub fn parent(&self) -> Option<&WeakObjectHandle> {
        self.parent.as_ref()
    }

    /// Whether the bound class is, or descends from, the named class.
    pub fn is_a(&self, class_name: &str) -> bool {
        self.class
            .as_ref()
            .is_some_and(|class| class.declares_ancestor(class_name))
    }
}
