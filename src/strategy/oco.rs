//! OCO (one-cancels-other) order linkage (§4.6): on the first of a linked
//! pair reaching a terminal state, cancel the other through the executor,
//! exactly once (§7: `oco-missing-partner` is an idempotent no-op, §8
//! scenario F: "subsequent events for order 1 do not re-cancel order 2").

use crate::events::OrderStatus;
use crate::ids::OrderId;
use std::collections::HashMap;

/// The minimal executor seam an [`OcoTracker`] cancels through — a single
/// method, matching the crate's preference for small traits at integration
/// boundaries (see [`crate::composite::Executor`]).
pub trait OrderCanceler {
    fn cancel(&self, order_id: OrderId);
}

/// Bidirectional map of OCO-linked order IDs, with idempotent cancel
/// firing (§4.6, §8 scenario F).
pub struct OcoTracker {
    partner_of: HashMap<OrderId, OrderId>,
    resolved: HashMap<OrderId, bool>,
}

impl OcoTracker {
    pub fn new() -> Self {
        Self {
            partner_of: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Link `a` and `b` as an OCO pair.
    pub fn register(&mut self, a: OrderId, b: OrderId) {
        self.partner_of.insert(a, b);
        self.partner_of.insert(b, a);
        self.resolved.insert(a, false);
        self.resolved.insert(b, false);
    }

    /// Feed in an order-status transition. If `order_id` is linked and has
    /// just reached a terminal state for the first time, cancel its
    /// partner through `canceler`. A partner with no registered link, or
    /// an order already resolved, is an idempotent no-op (§7:
    /// `oco-missing-partner`).
    pub fn on_status(&mut self, order_id: OrderId, status: OrderStatus, canceler: &dyn OrderCanceler) {
        if !status.is_terminal() {
            return;
        }
        let Some(&partner) = self.partner_of.get(&order_id) else {
            return;
        };
        let already_resolved = self.resolved.get(&order_id).copied().unwrap_or(true);
        if already_resolved {
            return;
        }
        self.resolved.insert(order_id, true);
        self.resolved.insert(partner, true);
        canceler.cancel(partner);
    }

    /// Remove a pair's tracking state, e.g. once both legs have settled.
    pub fn forget(&mut self, a: OrderId) {
        if let Some(b) = self.partner_of.remove(&a) {
            self.partner_of.remove(&b);
            self.resolved.remove(&a);
            self.resolved.remove(&b);
        }
    }
}

impl Default for OcoTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingCanceler {
        canceled: Mutex<Vec<OrderId>>,
    }

    impl RecordingCanceler {
        fn new() -> Self {
            Self {
                canceled: Mutex::new(Vec::new()),
            }
        }
    }

    impl OrderCanceler for RecordingCanceler {
        fn cancel(&self, order_id: OrderId) {
            self.canceled.lock().unwrap().push(order_id);
        }
    }

    #[test]
    fn first_terminal_leg_cancels_the_other_exactly_once() {
        let mut tracker = OcoTracker::new();
        let canceler = RecordingCanceler::new();
        let (a, b) = (OrderId::new(1), OrderId::new(2));
        tracker.register(a, b);

        tracker.on_status(a, OrderStatus::Filled, &canceler);
        tracker.on_status(a, OrderStatus::Filled, &canceler); // repeat event, must not re-cancel
        tracker.on_status(b, OrderStatus::Canceled, &canceler); // the cancel landing, also must not re-cancel

        assert_eq!(canceler.canceled.lock().unwrap().as_slice(), &[b]);
    }

    #[test]
    fn non_terminal_status_does_not_trigger_a_cancel() {
        let mut tracker = OcoTracker::new();
        let canceler = RecordingCanceler::new();
        let (a, b) = (OrderId::new(1), OrderId::new(2));
        tracker.register(a, b);
        tracker.on_status(a, OrderStatus::PartiallyFilled, &canceler);
        assert!(canceler.canceled.lock().unwrap().is_empty());
    }

    #[test]
    fn unregistered_order_is_a_no_op() {
        let mut tracker = OcoTracker::new();
        let canceler = RecordingCanceler::new();
        tracker.on_status(OrderId::new(99), OrderStatus::Filled, &canceler);
        assert!(canceler.canceled.lock().unwrap().is_empty());
    }
}
