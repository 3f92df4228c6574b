//! Validated handles to heap-managed engine objects.
//!
//! A handle stores a cell address plus a snapshot of the target's identity
//! hash, taken at construction. It holds no reference count: resolution
//! re-checks the hash against the cell's current occupant and silently
//! returns absent when the cell has been freed or reused. That is the
//! deliberate replacement for a generation counter.
//!
//! Strong- and weak-flavored handles share one mechanism; the distinction is
//! documentary, signaling intended retention to readers. Object liveness is
//! governed solely by the heap's `keep_alive` roots plus traversal
//! reachability.

/// Location of one cell: size class, block within the class, cell within the
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellAddr {
    pub(crate) class: u32,
    pub(crate) block: u32,
    pub(crate) cell: u32,
}

/// The shared mechanics of both handle flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RawObjectHandle {
    addr: Option<CellAddr>,
    identity_hash: u64,
}

impl RawObjectHandle {
    const NULL: RawObjectHandle = RawObjectHandle {
        addr: None,
        identity_hash: 0,
    };

    fn new(addr: CellAddr, identity_hash: u64) -> Self {
        RawObjectHandle {
            addr: Some(addr),
            identity_hash,
        }
    }

    fn is_null(&self) -> bool {
        self.addr.is_none()
    }

    fn reset(&mut self) {
        *self = RawObjectHandle::NULL;
    }
}

/// Strong-flavored validated handle: the holder intends to treat the target
/// as something it relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectHandle(RawObjectHandle);

impl ObjectHandle {
    /// The null handle; always resolves to absent.
    pub fn null() -> Self {
        ObjectHandle(RawObjectHandle::NULL)
    }

    pub(crate) fn new(addr: CellAddr, identity_hash: u64) -> Self {
        ObjectHandle(RawObjectHandle::new(addr, identity_hash))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// The identity-hash snapshot taken when the handle was created.
    pub fn identity_hash(&self) -> u64 {
        self.0.identity_hash
    }

    /// Clear the handle. Does not affect the target's lifetime.
    pub fn reset(&mut self) {
        self.0.reset();
    }

    /// The weak-flavored view of the same target.
    pub fn downgrade(&self) -> WeakObjectHandle {
        WeakObjectHandle(self.0)
    }

    pub(crate) fn addr(&self) -> Option<CellAddr> {
        self.0.addr
    }
}

/// Weak-flavored validated handle: the holder observes the target but does
/// not rely on it outliving anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeakObjectHandle(RawObjectHandle);

impl WeakObjectHandle {
    pub fn null() -> Self {
        WeakObjectHandle(RawObjectHandle::NULL)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn identity_hash(&self) -> u64 {
        self.0.identity_hash
    }

    pub fn reset(&mut self) {
        self.0.reset();
    }

    /// The strong-flavored view of the same target. Mechanically identical;
    /// records intent only.
    pub fn upgrade(&self) -> ObjectHandle {
        ObjectHandle(self.0)
    }

    pub(crate) fn addr(&self) -> Option<CellAddr> {
        self.0.addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(class: u32, block: u32, cell: u32) -> CellAddr {
        CellAddr { class, block, cell }
    }

    #[test]
    fn test_null_handle() {
        let handle = ObjectHandle::null();
        assert!(handle.is_null());
        assert_eq!(handle.identity_hash(), 0);
        assert_eq!(handle, ObjectHandle::default());
    }

    #[test]
    fn test_reset_clears_address_and_snapshot() {
        let mut handle = ObjectHandle::new(addr(0, 0, 3), 0xdead_beef);
        assert!(!handle.is_null());
        handle.reset();
        assert!(handle.is_null());
        assert_eq!(handle.identity_hash(), 0);
    }

    #[test]
    fn test_flavor_conversion_preserves_mechanics() {
        let strong = ObjectHandle::new(addr(1, 2, 3), 42);
        let weak = strong.downgrade();
        assert_eq!(weak.identity_hash(), 42);
        assert_eq!(weak.addr(), strong.addr());
        assert_eq!(weak.upgrade(), strong);
    }
}
