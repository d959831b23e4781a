//! Update/side vocabulary for [`super::Book`] (§4.3).

use crate::decimal::{Price, Quantity};

/// Which side of the book a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

/// Whether a [`BookUpdate`] replaces the book wholesale or adjusts it
/// incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Full replacement: both sides are cleared and re-anchored before the
    /// levels are written.
    Snapshot,
    /// Incremental adjustment: existing levels are preserved, only the
    /// given (price, qty) pairs change. A quantity of zero removes the
    /// level.
    Delta,
}

/// One (price, quantity) pair to apply to one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub price: Price,
    pub qty: Quantity,
}

/// A market-data update to apply via [`super::Book::apply`].
#[derive(Debug, Clone)]
pub struct BookUpdate {
    pub kind: UpdateKind,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    /// Monotonically increasing per symbol; a snapshot resets the
    /// expected sequence to this value, a delta must continue it exactly
    /// (§3: "a gap requires a resynchronising snapshot").
    pub sequence_number: u64,
}

/// Result of walking consecutive levels from the best price inward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResult {
    /// Quantity actually filled (≤ the amount requested).
    pub filled: Quantity,
    /// Notional traded, rescaled once at the end from a 128-bit accumulator.
    pub notional: crate::decimal::Volume,
    /// Whether the book ran out of levels before `filled` reached the
    /// requested quantity.
    pub exhausted: bool,
}
