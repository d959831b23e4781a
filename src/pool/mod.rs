//! Reference-counted object pool (§4.2): a slab of `N` reusable objects
//! with a lock-free free list, returning objects to the pool on the last
//! handle release.
//!
//! Grounded in the teacher's `MatchingPool` (`orderbook/pool.rs`), which
//! pools scratch `Vec`s behind a `RefCell` to avoid per-match allocation;
//! this pool generalizes the same idea to arbitrary poolable event types,
//! shared across threads (the teacher's pool is single-threaded scratch
//! space, so the free list here is new: a lock-free stack, see
//! [`freelist::FreeList`]) and refcounted so a pooled object can outlive
//! the call that acquired it by riding along in bus slots (§4.2, §9).

mod arena;
mod error;
mod freelist;
mod handle;

pub use arena::Arena;
pub use error::PoolError;
pub use handle::{Handle, Poolable};

use freelist::FreeList;
use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct Slot<T> {
    refcount: AtomicU32,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` is gated by `refcount` transitions (zero means
// uniquely owned by the free list / about to be reset, nonzero means
// shared per the `Handle` contract documented in `handle.rs`).
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

pub(crate) struct PoolInner<T> {
    slots: Box<[Slot<T>]>,
    free: FreeList,
}

/// A fixed-capacity, thread-safe slab of reusable `T`s.
///
/// `acquire` is lock-free and allocation-free: every object is constructed
/// once, up front, in [`Pool::new`]; handing one out only flips its
/// refcount from 0 to 1 and pops its index off the free list.
#[derive(Clone)]
pub struct Pool<T: Poolable> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Poolable> Pool<T> {
    /// Build a pool of `capacity` objects, each default-constructed.
    pub fn new(capacity: usize) -> Self {
        let slots: Box<[Slot<T>]> = (0..capacity)
            .map(|_| Slot {
                refcount: AtomicU32::new(0),
                value: UnsafeCell::new(T::default()),
            })
            .collect();
        Self {
            inner: Arc::new(PoolInner {
                slots,
                free: FreeList::new_full(capacity),
            }),
        }
    }

    /// The pool's fixed capacity (`N`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Acquire exclusive ownership of one object (refcount starts at 1),
    /// or [`PoolError::Exhausted`] if the free list is empty.
    pub fn acquire(&self) -> Result<Handle<T>, PoolError> {
        match self.inner.free.pop() {
            Some(index) => {
                let prev = self.inner.slots[index as usize]
                    .refcount
                    .swap(1, Ordering::AcqRel);
                debug_assert_eq!(prev, 0, "acquired a slot that was already live");
                Ok(Handle {
                    pool: Arc::clone(&self.inner),
                    index,
                })
            }
            None => {
                #[cfg(feature = "metrics")]
                metrics::counter!("flox_pool_exhausted_total").increment(1);
                Err(PoolError::Exhausted {
                    capacity: self.capacity(),
                })
            }
        }
    }

    /// Number of slots currently on the free list. For diagnostics only —
    /// under concurrent use this is a snapshot, not a synchronization
    /// point.
    pub fn available(&self) -> usize {
        let mut count = 0;
        let mut popped = Vec::new();
        while let Some(i) = self.inner.free.pop() {
            popped.push(i);
            count += 1;
        }
        for i in popped {
            self.inner.free.push(i);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Scratch {
        values: Vec<u32>,
    }

    impl Poolable for Scratch {
        fn reset(&mut self) {
            self.values.clear();
        }
    }

    #[test]
    fn exhaustion_and_release_cycle() {
        let pool: Pool<Scratch> = Pool::new(2);
        let mut a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        assert!(matches!(
            pool.acquire(),
            Err(PoolError::Exhausted { capacity: 2 })
        ));

        a.get_mut().values.push(7);
        assert_eq!(a.get().values, vec![7]);
        drop(a);

        let c = pool.acquire().unwrap();
        assert!(c.get().values.is_empty(), "reset must clear prior state");
    }

    #[test]
    fn clone_keeps_object_alive_until_last_drop() {
        let pool: Pool<Scratch> = Pool::new(1);
        let h1 = pool.acquire().unwrap();
        let h2 = h1.clone();
        assert_eq!(h1.refcount(), 2);
        drop(h1);
        assert!(pool.acquire().is_err(), "still held by h2");
        drop(h2);
        assert!(pool.acquire().is_ok(), "returned to free list");
    }

    #[test]
    fn conservation_holds_under_concurrency() {
        use std::sync::Arc as StdArc;
        use std::thread;

        const N: usize = 16;
        let pool: Pool<Scratch> = Pool::new(N);
        let pool = StdArc::new(pool);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = StdArc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..5000 {
                    if let Ok(h) = pool.acquire() {
                        std::hint::black_box(&h);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.available(), N);
    }
}
