//! A lock-free LIFO free list of slot indices, implemented as a tagged
//! Treiber stack over a fixed array of `next` links (§4.2: "a lock-free
//! LIFO of free indices").
//!
//! Indices are stable slot numbers that get pushed and popped repeatedly,
//! so a plain `AtomicU32` head would be vulnerable to the ABA problem: a
//! thread could read index 3 as the head, get preempted, have index 3
//! popped and pushed back by other threads, then successfully CAS onto a
//! head it never actually observed consistently. The tag half of the
//! packed `head` word is bumped on every push, so a stale CAS is rejected
//! even if the index happens to match.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

const EMPTY: u32 = u32::MAX;

pub(crate) struct FreeList {
    /// Packed as `(tag: u32) << 32 | (index: u32)`; `index == EMPTY` means
    /// the stack is empty.
    head: AtomicU64,
    next: Box<[AtomicU32]>,
}

impl FreeList {
    /// Build a free list initially holding every index in `0..capacity`,
    /// with `capacity - 1` on top (so `pop` returns ascending indices on a
    /// freshly created pool, purely cosmetic but makes tests readable).
    pub(crate) fn new_full(capacity: usize) -> Self {
        let next: Box<[AtomicU32]> = (0..capacity)
            .map(|i| AtomicU32::new(if i == 0 { EMPTY } else { (i - 1) as u32 }))
            .collect();
        let head = if capacity == 0 {
            EMPTY as u64
        } else {
            (capacity - 1) as u64
        };
        Self {
            head: AtomicU64::new(head),
            next,
        }
    }

    fn pack(tag: u32, index: u32) -> u64 {
        ((tag as u64) << 32) | index as u64
    }

    fn unpack(word: u64) -> (u32, u32) {
        ((word >> 32) as u32, word as u32)
    }

    pub(crate) fn push(&self, index: u32) {
        let mut old = self.head.load(Ordering::Acquire);
        loop {
            let (tag, old_index) = Self::unpack(old);
            self.next[index as usize].store(old_index, Ordering::Relaxed);
            let new = Self::pack(tag.wrapping_add(1), index);
            match self
                .head
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(observed) => old = observed,
            }
        }
    }

    pub(crate) fn pop(&self) -> Option<u32> {
        let mut old = self.head.load(Ordering::Acquire);
        loop {
            let (tag, index) = Self::unpack(old);
            if index == EMPTY {
                return None;
            }
            let next_index = self.next[index as usize].load(Ordering::Relaxed);
            let new = Self::pack(tag.wrapping_add(1), next_index);
            match self
                .head
                .compare_exchange_weak(old, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(index),
                Err(observed) => old = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_pop_round_trips_every_index() {
        let list = FreeList::new_full(8);
        let mut seen = Vec::new();
        while let Some(i) = list.pop() {
            seen.push(i);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert_eq!(list.pop(), None);
        list.push(3);
        list.push(5);
        let mut got = vec![list.pop().unwrap(), list.pop().unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec![3, 5]);
    }

    #[test]
    fn concurrent_push_pop_preserves_count() {
        let list = Arc::new(FreeList::new_full(64));
        // Drain to empty first.
        while list.pop().is_some() {}
        for i in 0..64 {
            list.push(i);
        }
        let mut handles = Vec::new();
        for _ in 0..8 {
            let list = Arc::clone(&list);
            handles.push(thread::spawn(move || {
                let mut local = Vec::new();
                for _ in 0..1000 {
                    if let Some(i) = list.pop() {
                        local.push(i);
                    }
                    if let Some(i) = local.pop() {
                        list.push(i);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut total = 0;
        while list.pop().is_some() {
            total += 1;
        }
        assert_eq!(total, 64);
    }
}
