//! Error type for the event bus (§7).

/// Errors raised by [`super::Bus`] operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BusError {
    /// The bus has been stopped; no further publication is accepted.
    #[error("bus is stopped")]
    Stopped,
    /// The producer-side sequence counter would overflow `i64`. The bus is
    /// marked stopped as a side effect, matching §4.1's disposition.
    #[error("sequence counter overflowed; bus is now stopped")]
    SequenceOverflow,
    /// `subscribe` was called after `start`.
    #[error("cannot subscribe after the bus has started")]
    AlreadyStarted,
    /// `subscribe` was called with the consumer capacity already reached.
    #[error("consumer capacity ({max_consumers}) reached")]
    ConsumerCapped {
        /// The bus's compile-time consumer capacity.
        max_consumers: usize,
    },
}

/// The outcome of [`super::Bus::try_publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event was constructed and published at this sequence.
    Published(u64),
    /// The deadline elapsed before ring space was available; the slot was
    /// finalized as a timeout placeholder at this sequence instead.
    TimedOut(u64),
}
