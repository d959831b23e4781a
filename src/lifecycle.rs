//! Subsystem lifecycle and subscriber capability sets (§6, §9).
//!
//! The source modelled a participant as multiply inheriting from a
//! subsystem base and a subscriber base; §9 maps that to *capability
//! sets* instead — a lifecycle capability plus zero or more subscriber
//! capabilities, each its own small trait. Grounded in
//! `brbtavares-tucano`'s `start`/`stop` subsystem convention (its
//! `trader`/`strategies` crates), since the teacher has no multi-component
//! startup sequence of its own to draw from.

use crate::events::{BarEvent, BookUpdateEvent, OrderEvent, TradeEvent};

/// A component with an explicit start/stop lifecycle (§6: "subsystem.start(),
/// subsystem.stop() on every subsystem").
pub trait Subsystem {
    fn start(&self);
    fn stop(&self);
}

/// Start every subsystem in `subsystems`, in order. §6: "subsystems before
/// connectors" — call this before any connector thread is spawned.
pub fn start_all(subsystems: &[&dyn Subsystem]) {
    for subsystem in subsystems {
        subsystem.start();
    }
}

/// Stop every subsystem in `subsystems`, in order. §6: "connectors before
/// subsystems" — call this only after every connector has already been
/// stopped.
pub fn stop_all(subsystems: &[&dyn Subsystem]) {
    for subsystem in subsystems {
        subsystem.stop();
    }
}

/// Subscriber capability sets (§9): a participant implements only the
/// callbacks relevant to it rather than one monolithic listener interface.
pub mod capability {
    use super::*;

    /// Receives executed trades.
    pub trait TradeListener {
        fn on_trade(&mut self, trade: &TradeEvent);
    }

    /// Receives book snapshots/deltas.
    pub trait BookUpdateListener {
        fn on_book_update(&mut self, update: &BookUpdateEvent);
    }

    /// Receives completed bars.
    pub trait BarListener {
        fn on_bar(&mut self, bar: &BarEvent);
    }

    /// Receives order lifecycle notifications.
    pub trait OrderEventListener {
        fn on_order_event(&mut self, event: &OrderEvent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl Subsystem for Counting {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn start_all_and_stop_all_visit_every_subsystem_in_order() {
        let a = Counting {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        };
        let b = Counting {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        };
        start_all(&[&a, &b]);
        stop_all(&[&b, &a]);
        assert_eq!(a.starts.load(Ordering::SeqCst), 1);
        assert_eq!(b.starts.load(Ordering::SeqCst), 1);
        assert_eq!(a.stops.load(Ordering::SeqCst), 1);
        assert_eq!(b.stops.load(Ordering::SeqCst), 1);
    }
}
