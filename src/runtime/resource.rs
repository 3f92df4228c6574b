//! Intrusive reference counting for shared engine values.
//!
//! A [`ResourceBlock`] pairs an atomic strong count, an atomic weak count and
//! the address of a managed value. [`Shared`] and [`WeakShared`] are the thin
//! user-facing handles over one block. The value is destroyed when the strong
//! count reaches zero; the block's own memory is released when the weak count
//! reaches zero (the strong reference set holds one implicit weak reference).
//!
//! Two allocation strategies exist:
//! - `ValueOnly`: the value lives in its own allocation, released when the
//!   strong count reaches zero; the block is released separately.
//! - `Combined`: one allocation holds the value followed by the block. The
//!   value is destroyed in place at strong zero and the single allocation is
//!   released exactly once, at weak zero.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::Deref;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering, fence};

// =============================================================================
// ResourceBlock - the intrusive control block
// =============================================================================

/// How the block and its value were allocated, which decides how they are
/// released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocStrategy {
    /// Value and block are separate allocations, released separately.
    ValueOnly,
    /// Value and block share one allocation (value first), released once.
    Combined,
}

/// The control block behind every [`Shared`]/[`WeakShared`] pair.
///
/// Invariant: the value pointer is non-null iff the strong count is nonzero.
/// Once the strong count hits zero the value is destroyed in place, but the
/// block itself survives until the weak count also hits zero.
pub struct ResourceBlock<T> {
    strong: AtomicUsize,
    weak: AtomicUsize,
    value: AtomicPtr<T>,
    strategy: AllocStrategy,
}

/// Combined-allocation layout: the value is constructed first, the block
/// after it, so the block always points at a fully constructed value.
#[repr(C)]
struct CombinedAlloc<T> {
    value: MaybeUninit<T>,
    block: ResourceBlock<T>,
}

impl<T> ResourceBlock<T> {
    fn new_value_only(value: T) -> NonNull<ResourceBlock<T>> {
        let value_ptr = Box::into_raw(Box::new(value));
        let block = Box::new(ResourceBlock {
            strong: AtomicUsize::new(1),
            // The strong reference set holds one implicit weak reference.
            weak: AtomicUsize::new(1),
            value: AtomicPtr::new(value_ptr),
            strategy: AllocStrategy::ValueOnly,
        });
        // SAFETY: Box::into_raw never returns null.
        unsafe { NonNull::new_unchecked(Box::into_raw(block)) }
    }

    fn new_combined(value: T) -> NonNull<ResourceBlock<T>> {
        let alloc = Box::new(CombinedAlloc {
            value: MaybeUninit::new(value),
            block: ResourceBlock {
                strong: AtomicUsize::new(1),
                weak: AtomicUsize::new(1),
                value: AtomicPtr::new(ptr::null_mut()),
                strategy: AllocStrategy::Combined,
            },
        });
        let container = Box::into_raw(alloc);
        // SAFETY: container is a live allocation; the value field address is
        // stable for the allocation's lifetime.
        unsafe {
            let value_ptr = (&raw mut (*container).value).cast::<T>();
            (*container).block.value.store(value_ptr, Ordering::Release);
            NonNull::new_unchecked(&raw mut (*container).block)
        }
    }

    /// Current number of strong references.
    pub fn strong_count(&self) -> usize {
        self.strong.load(Ordering::Acquire)
    }

    /// Current number of weak references (including the strong set's
    /// implicit one while the value is alive).
    pub fn weak_count(&self) -> usize {
        self.weak.load(Ordering::Acquire)
    }

    /// Whether the managed value is still alive.
    pub fn has_value(&self) -> bool {
        self.strong.load(Ordering::Acquire) > 0
    }

    /// The allocation strategy this block was created with.
    pub fn strategy(&self) -> AllocStrategy {
        self.strategy
    }

    fn inc_strong(&self) {
        let prev = self.strong.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "strong count revived from zero");
    }

    fn inc_weak(&self) {
        let prev = self.weak.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "weak count revived from zero");
    }

    /// Attempt to add a strong reference when at least one already exists.
    /// Fails once the count has reached zero, i.e. the value is destroyed.
    fn try_inc_strong(&self) -> bool {
        let mut count = self.strong.load(Ordering::Relaxed);
        loop {
            if count == 0 {
                return false;
            }
            match self.strong.compare_exchange_weak(
                count,
                count + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => count = current,
            }
        }
    }

    /// Remove one strong reference. The thread that drops the count to zero
    /// destroys the value in place and then releases the strong set's
    /// implicit weak reference.
    fn dec_strong(block: NonNull<Self>) {
        // SAFETY: caller holds a strong reference, so the block is alive.
        let this = unsafe { block.as_ref() };
        let prev = this.strong.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "released more strong references than held");
        if prev != 1 {
            return;
        }
        fence(Ordering::Acquire);

        let value_ptr = this.value.swap(ptr::null_mut(), Ordering::AcqRel);
        debug_assert!(!value_ptr.is_null(), "live block without a value");
        match this.strategy {
            // Separate allocation: destroying the value also releases it.
            AllocStrategy::ValueOnly => unsafe { drop(Box::from_raw(value_ptr)) },
            // Shared allocation: destroy in place, storage goes with the block.
            AllocStrategy::Combined => unsafe { ptr::drop_in_place(value_ptr) },
        }

        Self::dec_weak(block);
    }

    /// Remove one weak reference. The thread that drops the count to zero
    /// releases the block's memory.
    fn dec_weak(block: NonNull<Self>) {
        // SAFETY: caller holds a weak reference, so the block is alive.
        let this = unsafe { block.as_ref() };
        let prev = this.weak.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "released more weak references than held");
        if prev != 1 {
            return;
        }
        fence(Ordering::Acquire);

        match this.strategy {
            AllocStrategy::ValueOnly => {
                // SAFETY: last reference of any kind; the block was allocated
                // with Box::new in new_value_only.
                unsafe { drop(Box::from_raw(block.as_ptr())) }
            }
            AllocStrategy::Combined => {
                // Recover the containing allocation from the block address.
                // The value field is MaybeUninit, so dropping the container
                // box releases the storage without touching the (already
                // destroyed) value.
                let offset = mem::offset_of!(CombinedAlloc<T>, block);
                // SAFETY: the block lives at `offset` inside a CombinedAlloc
                // created by Box::new in new_combined.
                unsafe {
                    let container = block.as_ptr().cast::<u8>().sub(offset).cast::<CombinedAlloc<T>>();
                    drop(Box::from_raw(container));
                }
            }
        }
    }

    fn value_ptr(&self) -> *mut T {
        self.value.load(Ordering::Acquire)
    }
}

// =============================================================================
// Shared - strong handle
// =============================================================================

/// A strong handle to a reference-counted value.
///
/// Cloning adds a strong reference; dropping removes it. The handle may be
/// explicitly [`reset`](Shared::reset) to the null state, after which
/// dereferencing is a logic error (assertion), never a silent failure.
pub struct Shared<T> {
    block: Option<NonNull<ResourceBlock<T>>>,
    _marker: PhantomData<ResourceBlock<T>>,
}

// Counts are atomic; the handle itself must not be mutated from two threads
// at once, which &mut already enforces.
unsafe impl<T: Send + Sync> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}

impl<T> Shared<T> {
    /// Create a handle over a value in its own allocation.
    pub fn new(value: T) -> Self {
        Shared {
            block: Some(ResourceBlock::new_value_only(value)),
            _marker: PhantomData,
        }
    }

    /// Create a handle with the value and its block in one allocation.
    pub fn new_combined(value: T) -> Self {
        Shared {
            block: Some(ResourceBlock::new_combined(value)),
            _marker: PhantomData,
        }
    }

    /// The null handle. Holds no reference and has no value.
    pub fn null() -> Self {
        Shared {
            block: None,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }

    /// Whether this handle currently refers to a live value.
    pub fn has_value(&self) -> bool {
        match self.block {
            // SAFETY: we hold a strong reference, the block is alive.
            Some(block) => unsafe { block.as_ref().has_value() },
            None => false,
        }
    }

    /// Borrow the managed value.
    ///
    /// Dereferencing an empty handle is programmer misuse and asserts.
    pub fn get(&self) -> &T {
        let block = self.block.expect("dereferenced an empty shared handle");
        // SAFETY: this handle holds a strong reference, so the value pointer
        // is non-null and the value outlives the borrow.
        unsafe {
            let ptr = block.as_ref().value_ptr();
            debug_assert!(!ptr.is_null(), "strong handle without a value");
            &*ptr
        }
    }

    /// Non-asserting access; `None` for a null handle.
    pub fn try_get(&self) -> Option<&T> {
        let block = self.block?;
        // SAFETY: this handle holds a strong reference, so the value pointer
        // is non-null and the value outlives the borrow.
        unsafe {
            let ptr = block.as_ref().value_ptr();
            debug_assert!(!ptr.is_null(), "strong handle without a value");
            Some(&*ptr)
        }
    }

    /// Mutable access, only when this is the sole handle of either kind.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        let block = self.block?;
        // SAFETY: we hold a strong reference.
        let inner = unsafe { block.as_ref() };
        if inner.strong_count() == 1 && inner.weak_count() == 1 {
            // SAFETY: unique access just checked; no other handle can appear
            // while we hold &mut self.
            unsafe { Some(&mut *inner.value_ptr()) }
        } else {
            None
        }
    }

    /// Release this handle's reference and become null.
    pub fn reset(&mut self) {
        if let Some(block) = self.block.take() {
            ResourceBlock::dec_strong(block);
        }
    }

    /// Create a weak handle to the same block.
    pub fn downgrade(&self) -> WeakShared<T> {
        match self.block {
            Some(block) => {
                // SAFETY: we hold a strong reference.
                unsafe { block.as_ref().inc_weak() };
                WeakShared {
                    block: Some(block),
                    _marker: PhantomData,
                }
            }
            None => WeakShared::null(),
        }
    }

    /// Number of strong references on the underlying block (0 for null).
    pub fn strong_count(&self) -> usize {
        match self.block {
            Some(block) => unsafe { block.as_ref().strong_count() },
            None => 0,
        }
    }

    /// Number of weak references on the underlying block (0 for null).
    pub fn weak_count(&self) -> usize {
        match self.block {
            Some(block) => unsafe { block.as_ref().weak_count() },
            None => 0,
        }
    }

    /// Whether two handles refer to the same block.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        self.block == other.block
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            // SAFETY: we hold a strong reference.
            unsafe { block.as_ref().inc_strong() };
        }
        Shared {
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            ResourceBlock::dec_strong(block);
        }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Shared::null()
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(_) => f
                .debug_struct("Shared")
                .field("strong", &self.strong_count())
                .field("weak", &self.weak_count())
                .finish(),
            None => write!(f, "Shared(null)"),
        }
    }
}

// =============================================================================
// WeakShared - weak handle
// =============================================================================

/// A weak handle: keeps the block alive but never the value.
pub struct WeakShared<T> {
    block: Option<NonNull<ResourceBlock<T>>>,
    _marker: PhantomData<ResourceBlock<T>>,
}

unsafe impl<T: Send + Sync> Send for WeakShared<T> {}
unsafe impl<T: Send + Sync> Sync for WeakShared<T> {}

impl<T> WeakShared<T> {
    /// The null weak handle.
    pub fn null() -> Self {
        WeakShared {
            block: None,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }

    /// Whether the managed value is still alive.
    pub fn has_value(&self) -> bool {
        match self.block {
            // SAFETY: we hold a weak reference, the block is alive.
            Some(block) => unsafe { block.as_ref().has_value() },
            None => false,
        }
    }

    /// Attempt to obtain a strong handle. Returns `None` once the value has
    /// been destroyed.
    pub fn upgrade(&self) -> Option<Shared<T>> {
        let block = self.block?;
        // SAFETY: we hold a weak reference, the block is alive.
        if unsafe { block.as_ref().try_inc_strong() } {
            Some(Shared {
                block: Some(block),
                _marker: PhantomData,
            })
        } else {
            None
        }
    }

    /// Release this handle's reference and become null.
    pub fn reset(&mut self) {
        if let Some(block) = self.block.take() {
            ResourceBlock::dec_weak(block);
        }
    }

    pub fn strong_count(&self) -> usize {
        match self.block {
            Some(block) => unsafe { block.as_ref().strong_count() },
            None => 0,
        }
    }

    pub fn weak_count(&self) -> usize {
        match self.block {
            Some(block) => unsafe { block.as_ref().weak_count() },
            None => 0,
        }
    }

    /// Whether two handles refer to the same block.
    pub fn ptr_eq(&self, other: &WeakShared<T>) -> bool {
        self.block == other.block
    }

    fn same_block(&self, block: NonNull<ResourceBlock<T>>) -> bool {
        self.block == Some(block)
    }
}

impl<T> Clone for WeakShared<T> {
    fn clone(&self) -> Self {
        if let Some(block) = self.block {
            // SAFETY: we hold a weak reference.
            unsafe { block.as_ref().inc_weak() };
        }
        WeakShared {
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for WeakShared<T> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            ResourceBlock::dec_weak(block);
        }
    }
}

impl<T> Default for WeakShared<T> {
    fn default() -> Self {
        WeakShared::null()
    }
}

impl<T> fmt::Debug for WeakShared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(_) => f
                .debug_struct("WeakShared")
                .field("strong", &self.strong_count())
                .field("weak", &self.weak_count())
                .finish(),
            None => write!(f, "WeakShared(null)"),
        }
    }
}

// =============================================================================
// Self-handles
// =============================================================================

/// Implemented by value types that want to mint handles to themselves.
///
/// The type embeds a [`SelfSlot`] and returns it here; the first strong
/// handle constructed over the value populates the slot with a hidden weak
/// self-reference.
pub trait SelfHandle: Sized {
    fn self_slot(&self) -> &SelfSlot<Self>;
}

/// Storage for a value's hidden weak self-reference.
pub struct SelfSlot<T> {
    slot: Cell<Option<WeakShared<T>>>,
}

impl<T> SelfSlot<T> {
    pub fn new() -> Self {
        SelfSlot {
            slot: Cell::new(None),
        }
    }

    /// Whether an owning block has been bound.
    pub fn is_bound(&self) -> bool {
        let slot = self.slot.take();
        let bound = slot.is_some();
        self.slot.set(slot);
        bound
    }
}

impl<T: SelfHandle> SelfSlot<T> {
    /// Mint a new strong handle to the owning value.
    ///
    /// Asserts that the value is owned by a block; callers hold a live
    /// reference to the value, so the upgrade cannot fail.
    pub fn shared(&self) -> Shared<T> {
        let weak = self.slot.take().expect("value is not owned by any block");
        let strong = weak.upgrade().expect("self-handle target already destroyed");
        self.slot.set(Some(weak));
        strong
    }
}

impl<T> Default for SelfSlot<T> {
    fn default() -> Self {
        SelfSlot::new()
    }
}

impl<T> fmt::Debug for SelfSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SelfSlot(bound: {})", self.is_bound())
    }
}

impl<T: SelfHandle> Shared<T> {
    /// Create a handle over a self-handle-enabling value and bind its slot.
    pub fn new_bound(value: T) -> Self {
        let shared = Shared::new(value);
        shared.bind_self();
        shared
    }

    /// Combined-allocation variant of [`Shared::new_bound`].
    pub fn new_combined_bound(value: T) -> Self {
        let shared = Shared::new_combined(value);
        shared.bind_self();
        shared
    }

    /// Populate (or re-populate) the value's self-handle slot from this
    /// handle.
    ///
    /// Asserts if the value is already owned by a different block: one raw
    /// value must never be owned twice.
    pub fn bind_self(&self) {
        let block = self.block.expect("cannot bind the self-slot of a null handle");
        let slot = &self.get().self_slot().slot;
        if let Some(existing) = slot.take() {
            assert!(
                existing.same_block(block),
                "value is already owned by a different resource block"
            );
            slot.set(Some(existing));
            return;
        }
        slot.set(Some(self.downgrade()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Counts drops so tests can observe value destruction.
    struct Tracked {
        drops: Rc<Cell<usize>>,
        payload: i64,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn tracked(payload: i64) -> (Tracked, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        (
            Tracked {
                drops: Rc::clone(&drops),
                payload,
            },
            drops,
        )
    }

    #[test]
    fn test_new_and_get() {
        let shared = Shared::new(42i64);
        assert!(!shared.is_null());
        assert!(shared.has_value());
        assert_eq!(*shared, 42);
        assert_eq!(shared.strong_count(), 1);
        assert_eq!(shared.weak_count(), 1); // the strong set's implicit weak
    }

    #[test]
    fn test_clone_counts() {
        let a = Shared::new("value".to_string());
        let b = a.clone();
        assert_eq!(a.strong_count(), 2);
        assert!(a.ptr_eq(&b));
        drop(b);
        assert_eq!(a.strong_count(), 1);
    }

    #[test]
    fn test_value_dropped_once_at_strong_zero() {
        let (value, drops) = tracked(7);
        let a = Shared::new(value);
        let b = a.clone();
        drop(a);
        assert_eq!(drops.get(), 0);
        drop(b);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_weak_does_not_keep_value_alive() {
        let (value, drops) = tracked(7);
        let strong = Shared::new(value);
        let weak = strong.downgrade();
        assert_eq!(strong.weak_count(), 2);
        drop(strong);
        assert_eq!(drops.get(), 1);
        assert!(!weak.has_value());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_upgrade_while_alive() {
        let strong = Shared::new(5u32);
        let weak = strong.downgrade();
        let second = weak.upgrade().expect("value is alive");
        assert_eq!(*second, 5);
        assert_eq!(strong.strong_count(), 2);
    }

    #[test]
    fn test_reset_releases_reference() {
        let (value, drops) = tracked(1);
        let mut shared = Shared::new(value);
        shared.reset();
        assert!(shared.is_null());
        assert!(!shared.has_value());
        assert_eq!(drops.get(), 1);
    }

    #[test]
    #[should_panic(expected = "dereferenced an empty shared handle")]
    fn test_get_after_reset_asserts() {
        let mut shared = Shared::new(3i32);
        shared.reset();
        let _ = shared.get();
    }

    #[test]
    fn test_get_mut_requires_uniqueness() {
        let mut shared = Shared::new(10i64);
        *shared.get_mut().expect("unique") += 1;
        assert_eq!(*shared, 11);

        let other = shared.clone();
        assert!(shared.get_mut().is_none());
        drop(other);

        let weak = shared.downgrade();
        assert!(shared.get_mut().is_none());
        drop(weak);
        assert!(shared.get_mut().is_some());
    }

    #[test]
    fn test_combined_value_and_block_are_contiguous() {
        let shared = Shared::new_combined(0xfeed_u64);
        let block = shared.block.unwrap();
        // SAFETY: test holds a strong reference.
        let value_addr = unsafe { block.as_ref().value_ptr() } as usize;
        let block_addr = block.as_ptr() as usize;
        assert!(value_addr < block_addr);
        assert!(block_addr - value_addr <= mem::size_of::<CombinedAlloc<u64>>());
    }

    #[test]
    fn test_combined_release_order() {
        let (value, drops) = tracked(9);
        let strong = Shared::new_combined(value);
        let weak = strong.downgrade();
        assert_eq!(strong.get().payload, 9);
        drop(strong);
        // Value destroyed in place, block storage still owned by the weak ref.
        assert_eq!(drops.get(), 1);
        assert!(weak.upgrade().is_none());
        drop(weak); // single release of the combined allocation
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_try_get() {
        let mut shared = Shared::new(4u8);
        assert_eq!(shared.try_get(), Some(&4));
        shared.reset();
        assert_eq!(shared.try_get(), None);
    }

    #[test]
    fn test_from_value() {
        let shared: Shared<String> = "converted".to_string().into();
        assert_eq!(shared.get(), "converted");
        assert_eq!(shared.strong_count(), 1);
    }

    #[test]
    fn test_weak_ptr_eq() {
        let a = Shared::new(1i32);
        let b = Shared::new(1i32);
        assert!(a.downgrade().ptr_eq(&a.downgrade()));
        assert!(!a.downgrade().ptr_eq(&b.downgrade()));
    }

    #[test]
    fn test_null_handles() {
        let strong: Shared<i32> = Shared::null();
        let weak: WeakShared<i32> = WeakShared::null();
        assert!(strong.is_null());
        assert!(!strong.has_value());
        assert_eq!(strong.strong_count(), 0);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_weak_clone_and_reset() {
        let strong = Shared::new(1u8);
        let weak = strong.downgrade();
        let mut weak2 = weak.clone();
        assert_eq!(strong.weak_count(), 3);
        weak2.reset();
        assert!(weak2.is_null());
        assert_eq!(strong.weak_count(), 2);
    }

    // Self-handle machinery

    struct Widget {
        slot: SelfSlot<Widget>,
        id: u32,
    }

    impl Widget {
        fn new(id: u32) -> Self {
            Widget {
                slot: SelfSlot::new(),
                id,
            }
        }
    }

    impl SelfHandle for Widget {
        fn self_slot(&self) -> &SelfSlot<Widget> {
            &self.slot
        }
    }

    #[test]
    fn test_self_handle_mints_same_block() {
        let owner = Shared::new_bound(Widget::new(77));
        assert!(owner.get().self_slot().is_bound());
        let minted = owner.get().self_slot().shared();
        assert_eq!(minted.get().id, 77);
        assert!(owner.ptr_eq(&minted));
        assert_eq!(owner.strong_count(), 2);
    }

    #[test]
    fn test_self_handle_combined() {
        let owner = Shared::new_combined_bound(Widget::new(5));
        let minted = owner.get().self_slot().shared();
        assert!(owner.ptr_eq(&minted));
    }

    #[test]
    fn test_rebind_same_block_is_allowed() {
        let owner = Shared::new_bound(Widget::new(1));
        owner.bind_self(); // idempotent for the owning block
        assert_eq!(owner.strong_count(), 1);
    }

    #[test]
    fn test_slot_weak_released_with_value() {
        // The slot's hidden weak reference dies with the value; the block is
        // then released by the strong set's implicit weak reference.
        let owner = Shared::new_bound(Widget::new(2));
        assert_eq!(owner.weak_count(), 2);
        drop(owner); // must not leak or double-free
    }

    #[test]
    fn test_threaded_clone_and_drop() {
        let shared = Shared::new(0u64);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let local = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let extra = local.clone();
                        assert!(extra.has_value());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.strong_count(), 1);
    }
}
