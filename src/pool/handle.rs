//! [`Handle<T>`]: the refcounted owning reference to a pooled object
//! (§4.2, §9 "smart-pointer refcount").

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::PoolInner;

/// A type poolable by [`super::Pool`]. `reset` is invoked exactly once,
/// on the last handle's release, before the slot is returned to the free
/// list — it must restore the object to a state indistinguishable from a
/// freshly constructed one (e.g. rewinding any [`super::Arena`] fields).
pub trait Poolable: Default {
    /// Restore `self` to its initial state for reuse.
    fn reset(&mut self);
}

/// A refcounted owning reference to one object in a [`super::Pool`].
///
/// Cloning increments the object's intrinsic atomic refcount; dropping the
/// last handle invokes [`Poolable::reset`] and returns the slot to the
/// pool's free list. Handles are safe to acquire, clone, and drop from any
/// thread; access to the pointee through `get`/`get_mut` is the caller's
/// synchronization responsibility (§4.2 thread model), as is typical for a
/// producer that owns a handle exclusively until it shares it with
/// consumers through the bus.
pub struct Handle<T: Poolable> {
    pub(super) pool: Arc<PoolInner<T>>,
    pub(super) index: u32,
}

impl<T: Poolable> Handle<T> {
    /// Immutable access to the pooled object.
    #[inline]
    pub fn get(&self) -> &T {
        // SAFETY: this handle holds a refcount on `index`, so the slot is
        // not on the free list and will not be reset/reused concurrently.
        unsafe { &*self.pool.slots[self.index as usize].value.get() }
    }

    /// Mutable access to the pooled object.
    ///
    /// # Safety contract
    ///
    /// The pool does not itself synchronize concurrent mutation through
    /// multiple handles to the same object (§4.2: "not synchronised across
    /// threads except for its intrinsic refcount"). Callers must ensure
    /// exclusive access — in the single-producer bus this holds because a
    /// producer mutates a pooled event before publishing it and never
    /// retains a mutable reference after consumers can observe it.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.pool.slots[self.index as usize].value.get() }
    }

    /// The slot index backing this handle, stable for the handle's
    /// lifetime. Useful for diagnostics; not meaningful across pools.
    #[inline]
    pub fn slot_index(&self) -> u32 {
        self.index
    }

    /// The number of outstanding handles (including this one) referencing
    /// the same object.
    #[inline]
    pub fn refcount(&self) -> u32 {
        self.pool.slots[self.index as usize]
            .refcount
            .load(Ordering::Acquire)
    }
}

impl<T: Poolable> Clone for Handle<T> {
    fn clone(&self) -> Self {
        let prev = self.pool.slots[self.index as usize]
            .refcount
            .fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "cloning a handle whose object was already freed");
        Self {
            pool: Arc::clone(&self.pool),
            index: self.index,
        }
    }
}

impl<T: Poolable> Drop for Handle<T> {
    fn drop(&mut self) {
        let slot = &self.pool.slots[self.index as usize];
        // Release on decrement pairs with Acquire when we observe 1, so
        // every prior write through any clone happens-before the reset.
        if slot.refcount.fetch_sub(1, Ordering::Release) == 1 {
            std::sync::atomic::fence(Ordering::Acquire);
            // SAFETY: refcount just hit zero under us, so no other handle
            // can be reading or writing the slot's value concurrently.
            unsafe { &mut *slot.value.get() }.reset();
            self.pool.free.push(self.index);
        }
    }
}

impl<T: Poolable + std::fmt::Debug> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("refcount", &self.refcount())
            .field("value", self.get())
            .finish()
    }
}

// SAFETY: `T: Send` objects can be accessed from another thread once
// moved there (the refcount synchronizes lifetime, not concurrent access,
// matching the pool's documented thread model).
unsafe impl<T: Poolable + Send> Send for Handle<T> {}
unsafe impl<T: Poolable + Sync> Sync for Handle<T> {}
