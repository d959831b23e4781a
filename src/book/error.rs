//! Error type for [`super::Book`] construction and update application (§7).

use crate::ids::SymbolId;

/// Errors raised when configuring or updating a [`super::Book`] (§7:
/// `book-sequence-gap`). Out-of-window levels (§7: `book-out-of-window`)
/// are not one of these: the disposition table calls for "drop update; no
/// propagation", so `Book::apply` logs and discards them instead of
/// returning an `Err` — surfacing them here would contradict that.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BookError {
    /// `tick_size` was zero or negative.
    #[error("tick size must be positive")]
    InvalidTickSize,
    /// A delta's `sequence_number` is greater than the last applied one
    /// plus one, i.e. one or more updates were missed. The book is marked
    /// invalid and refuses further deltas (§7: "invalidate side; await
    /// snapshot") until the next snapshot.
    #[error("sequence gap on {symbol:?}: expected {expected}, got {got}")]
    SequenceGap { symbol: SymbolId, expected: u64, got: u64 },
    /// A delta's `sequence_number` is less than the last applied one, i.e.
    /// a duplicate or reordered update arrived. Also invalidates the book
    /// pending a resynchronising snapshot.
    #[error("sequence regression on {symbol:?}: expected {expected}, got {got}")]
    SequenceRegression { symbol: SymbolId, expected: u64, got: u64 },
    /// A delta arrived while the book was already invalidated by a prior
    /// gap or regression; it is rejected without being applied.
    #[error("book is invalidated pending a resynchronising snapshot")]
    Invalidated,
}
