//! Split-order tracking (§4.5): a parent order fanned out across several
//! child orders (e.g. one per venue, or iceberg slices), with aggregate
//! fill/completion state folded in as child [`crate::events::OrderEvent`]s
//! arrive.
//!
//! No example in the pack tracks parent/child order relationships; grounded
//! in the teacher's dense-slot-plus-`HashMap`-overflow idiom used for its
//! own order maps (`orderbook/book.rs`), applied here per-parent instead
//! of per-symbol.

use super::error::SplitError;
use crate::decimal::Quantity;
use crate::ids::OrderId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildStatus {
    Working,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct ChildState {
    id: OrderId,
    quantity: Quantity,
    filled: Quantity,
    status: ChildStatus,
    created_ts_ns: i64,
}

struct ParentState {
    children: Vec<ChildState>,
}

/// Tracks up to `max_children` child orders per parent, aggregating fills
/// and completion as child [`crate::events::OrderEvent`]s arrive (§4.5).
pub struct SplitOrderTracker {
    max_children: usize,
    parents: HashMap<OrderId, ParentState>,
}

impl SplitOrderTracker {
    pub fn new(max_children: usize) -> Self {
        Self {
            max_children,
            parents: HashMap::new(),
        }
    }

    /// Register a new child under `parent`, sized `quantity`. Creates the
    /// parent entry on first use.
    pub fn register_child(
        &mut self,
        parent: OrderId,
        child: OrderId,
        quantity: Quantity,
        created_ts_ns: i64,
    ) -> Result<(), SplitError> {
        let state = self.parents.entry(parent).or_insert_with(|| ParentState { children: Vec::new() });
        if state.children.len() >= self.max_children {
            return Err(SplitError::ChildCapacity {
                max_children: self.max_children,
            });
        }
        state.children.push(ChildState {
            id: child,
            quantity,
            filled: Quantity::ZERO,
            status: ChildStatus::Working,
            created_ts_ns,
        });
        Ok(())
    }

    fn child_mut(&mut self, parent: OrderId, child: OrderId) -> Result<&mut ChildState, SplitError> {
        self.parents
            .get_mut(&parent)
            .and_then(|p| p.children.iter_mut().find(|c| c.id == child))
            .ok_or(SplitError::UnknownParent)
    }

    /// Fold a partial fill for one child into the tracker. Does not by
    /// itself mark the child complete — call [`Self::on_child_complete`]
    /// when the venue reports the child order as done.
    pub fn on_child_fill(&mut self, parent: OrderId, child: OrderId, fill_quantity: Quantity) -> Result<(), SplitError> {
        let state = self.child_mut(parent, child)?;
        state.filled = state.filled + fill_quantity;
        Ok(())
    }

    /// Mark a child as having reached a terminal, successful state.
    pub fn on_child_complete(&mut self, parent: OrderId, child: OrderId) -> Result<(), SplitError> {
        let state = self.child_mut(parent, child)?;
        state.status = ChildStatus::Completed;
        Ok(())
    }

    /// Mark a child as having reached a terminal, unsuccessful state
    /// (rejected, expired without a full fill, etc).
    pub fn on_child_fail(&mut self, parent: OrderId, child: OrderId) -> Result<(), SplitError> {
        let state = self.child_mut(parent, child)?;
        state.status = ChildStatus::Failed;
        Ok(())
    }

    /// Whether every registered child under `parent` has reached a
    /// terminal state (completed or failed).
    pub fn is_complete(&self, parent: OrderId) -> Result<bool, SplitError> {
        let state = self.parents.get(&parent).ok_or(SplitError::UnknownParent)?;
        Ok(state.children.iter().all(|c| c.status != ChildStatus::Working))
    }

    /// Whether every registered child under `parent` reached a terminal
    /// state and none of them failed.
    pub fn is_successful(&self, parent: OrderId) -> Result<bool, SplitError> {
        let state = self.parents.get(&parent).ok_or(SplitError::UnknownParent)?;
        Ok(state.children.iter().all(|c| c.status == ChildStatus::Completed))
    }

    /// `total filled / total requested` across every registered child.
    pub fn fill_ratio(&self, parent: OrderId) -> Result<f64, SplitError> {
        let state = self.parents.get(&parent).ok_or(SplitError::UnknownParent)?;
        let requested: i64 = state.children.iter().map(|c| c.quantity.raw()).sum();
        if requested == 0 {
            return Ok(0.0);
        }
        let filled: i64 = state.children.iter().map(|c| c.filled.raw()).sum();
        Ok(filled as f64 / requested as f64)
    }

    /// Remove a parent's tracking state once it is no longer needed.
    pub fn forget(&mut self, parent: OrderId) {
        self.parents.remove(&parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(v: f64) -> Quantity {
        Quantity::from_f64(v, Quantity::from_raw(1))
    }

    #[test]
    fn fill_ratio_aggregates_across_children() {
        let mut tracker = SplitOrderTracker::new(4);
        let parent = OrderId::new(1);
        tracker.register_child(parent, OrderId::new(10), qty(5.0), 0).unwrap();
        tracker.register_child(parent, OrderId::new(11), qty(5.0), 0).unwrap();

        tracker.on_child_fill(parent, OrderId::new(10), qty(5.0)).unwrap();
        tracker.on_child_fill(parent, OrderId::new(11), qty(2.5)).unwrap();

        assert_eq!(tracker.fill_ratio(parent).unwrap(), 0.75);
        assert!(!tracker.is_complete(parent).unwrap());
    }

    #[test]
    fn complete_and_successful_once_every_child_fills() {
        let mut tracker = SplitOrderTracker::new(4);
        let parent = OrderId::new(1);
        tracker.register_child(parent, OrderId::new(10), qty(5.0), 0).unwrap();
        tracker.register_child(parent, OrderId::new(11), qty(5.0), 0).unwrap();

        tracker.on_child_complete(parent, OrderId::new(10)).unwrap();
        tracker.on_child_complete(parent, OrderId::new(11)).unwrap();

        assert!(tracker.is_complete(parent).unwrap());
        assert!(tracker.is_successful(parent).unwrap());
    }

    #[test]
    fn one_failed_child_marks_complete_but_not_successful() {
        let mut tracker = SplitOrderTracker::new(4);
        let parent = OrderId::new(1);
        tracker.register_child(parent, OrderId::new(10), qty(5.0), 0).unwrap();
        tracker.register_child(parent, OrderId::new(11), qty(5.0), 0).unwrap();

        tracker.on_child_complete(parent, OrderId::new(10)).unwrap();
        tracker.on_child_fail(parent, OrderId::new(11)).unwrap();

        assert!(tracker.is_complete(parent).unwrap());
        assert!(!tracker.is_successful(parent).unwrap());
    }

    #[test]
    fn capacity_enforced_per_parent() {
        let mut tracker = SplitOrderTracker::new(1);
        let parent = OrderId::new(1);
        tracker.register_child(parent, OrderId::new(10), qty(5.0), 0).unwrap();
        let err = tracker.register_child(parent, OrderId::new(11), qty(5.0), 0).unwrap_err();
        assert!(matches!(err, SplitError::ChildCapacity { max_children: 1 }));
    }

    #[test]
    fn unknown_parent_reports_structured_error() {
        let mut tracker = SplitOrderTracker::new(4);
        let err = tracker.on_child_fill(OrderId::new(99), OrderId::new(1), qty(1.0)).unwrap_err();
        assert!(matches!(err, SplitError::UnknownParent));
    }
}
