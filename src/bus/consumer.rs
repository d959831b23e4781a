//! The per-consumer dispatch loop spawned by [`super::Bus::subscribe`].

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::ring::decode_marker;
use super::{Backoff, Bus, ConsumerKind, DrainOnStop, EventDispatcher};
use crossbeam::utils::CachePadded;
use std::sync::atomic::AtomicI64;

pub(super) fn run<E, D, const CAP: usize, const MAXC: usize>(
    bus: Arc<Bus<E, CAP, MAXC>>,
    mut dispatcher: D,
    kind: ConsumerKind,
    last_handled: Arc<CachePadded<AtomicI64>>,
) where
    E: Send + 'static,
    D: EventDispatcher<E>,
{
    let mut backoff = Backoff::new(bus.inner.backoff_policy);
    while !bus.inner.started.load(Ordering::Acquire) {
        if bus.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        backoff.pause();
    }
    backoff.reset();

    let mut next: i64 = 0;
    loop {
        if bus.inner.drain_on_stop == DrainOnStop::No && bus.inner.stopped.load(Ordering::Acquire) {
            // No-drain mode: exit as soon as the bus is stopped, even if
            // events already published past `next` remain unconsumed.
            return;
        }

        if kind == ConsumerKind::Optional {
            let cursor = bus.inner.cursor.load(Ordering::Acquire);
            let oldest_live = cursor - bus.inner.capacity + 1;
            if oldest_live > next {
                // Fell behind by more than the ring's capacity: the slots
                // we missed have already been overwritten. Resync instead
                // of stalling the producer (§4.1/§9: optional consumers
                // never gate back-pressure).
                next = oldest_live;
                last_handled.store(next - 1, Ordering::Release);
            }
        }

        let index = (next as u64 as usize) & (CAP - 1);
        let slot = &bus.inner.slots[index];
        let marker = slot.marker.load(Ordering::Acquire);
        match decode_marker(marker) {
            Some((seq, placeholder)) if seq as i64 == next => {
                if placeholder {
                    if kind == ConsumerKind::Required {
                        dispatcher.dispatch(None);
                    }
                } else {
                    // SAFETY: the marker's Acquire load synchronizes with
                    // the producer's Release store in `write_slot`, so the
                    // value written before that store is visible here.
                    let value = unsafe { &*slot.value.get() };
                    dispatcher.dispatch(value.as_ref());
                }
                next += 1;
                last_handled.store(next - 1, Ordering::Release);
                backoff.reset();
            }
            _ => {
                if bus.inner.stopped.load(Ordering::Acquire) {
                    let cursor = bus.inner.cursor.load(Ordering::Acquire);
                    if next > cursor {
                        return;
                    }
                }
                backoff.pause();
            }
        }
    }
}
