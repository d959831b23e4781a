//! Error type for the bar aggregator (§7).

use crate::ids::SymbolId;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BarError {
    /// The per-symbol dense slot ceiling was exceeded and this
    /// aggregator's policy state is not eligible for heap overflow
    /// storage (§9: "where the value type is non-movable, the overflow
    /// tail is disabled by type-level constraint").
    #[error("symbol {symbol} exceeds the dense slot ceiling and overflow is disabled")]
    SymbolCapacity { symbol: SymbolId },
    /// [`super::MultiTimeframeAggregator::subscribe_timeframe`] was called
    /// with the timeframe capacity already reached.
    #[error("timeframe capacity ({max_timeframes}) reached")]
    TimeframeCapacity { max_timeframes: usize },
}
