//! Curated re-exports for consumers who want the common types in scope
//! without spelling out every module path.

pub use crate::bar::{
    Bar, BarAggregator, BarError, BarKind, BarMatrix, BarParam, ClosePolicy, CloseReason, HeikinAshiPolicy,
    MultiTimeframeAggregator, RangePolicy, RenkoPolicy, TickPolicy, TimePolicy, TimeframeSlot, VolumePolicy,
};
pub use crate::book::{Book, BookError, BookUpdate, Level, Side, SweepResult, UpdateKind};
pub use crate::bus::{
    Backoff, BackoffPolicy, Bus, BusConfig, BusError, ConsumerKind, DrainOnStop, EventDispatcher, PublishOutcome,
    SequenceStamp,
};
pub use crate::composite::{
    AggregatedPositionTracker, ClockEstimate, ClockSync, CompositeBook, CompositeQuote, Executor, ExchangeQuote,
    FailoverPolicy, OrderRouter, RouterError, RoutingStrategy, SplitError, SplitOrderTracker,
};
pub use crate::decimal::{Price, Quantity, Volume, VolumeAccumulator};
pub use crate::events::{
    BarEvent, BookUpdateEvent, ExecFlags, OrderEvent, OrderSide, OrderState, OrderStatus, OrderType, TimeInForce,
    TradeEvent,
};
pub use crate::ids::{EquivalenceClassId, ExchangeId, OrderId, Registry, RegistryError, SubscriberId, SymbolId};
pub use crate::lifecycle::{capability, start_all, stop_all, Subsystem};
pub use crate::pool::{Arena, Handle, Pool, PoolError, Poolable};
pub use crate::strategy::{
    BarStrategy, KillSwitch, OcoTracker, OrderCanceler, RiskCheck, Signal, SignalExecutor, SignalHandler,
    SignalStrategy, SymbolStateMap,
};

#[cfg(feature = "journal")]
pub use crate::replay::{
    BookLevel, BookRecordHeader, CompressedBlockHeader, DecodedFrame, FrameHeader, FrameType, IndexEntry,
    IndexHeader, ReplayError, SegmentFrameIter, SegmentHeader, SegmentReader, SegmentWriter,
};
