//! Errors for the cross-venue aggregation layer (§7).

use crate::ids::ExchangeId;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RouterError {
    /// No executor was ever registered for the selected exchange.
    #[error("no executor registered for exchange {exchange}")]
    NoExecutor { exchange: ExchangeId },
    /// An executor is registered but the exchange has been disabled.
    #[error("exchange {exchange} is disabled")]
    ExchangeDisabled { exchange: ExchangeId },
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SplitError {
    /// A parent order already has `K` children tracked.
    #[error("split-order tracker capacity ({max_children}) reached for parent")]
    ChildCapacity { max_children: usize },
    /// A child fill/complete/fail was reported for a parent never registered.
    #[error("unknown parent order")]
    UnknownParent,
}
