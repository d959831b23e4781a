//! Shared wire-level event and order-state types (§3).
//!
//! These are the payloads that ride on [`crate::bus::Bus`] instances —
//! trades and book updates from market-data connectors, bars from the
//! aggregator, order events from execution. Every event carries both an
//! `exchange_ts_ns` and a `recv_ts_ns`, in monotonic nanoseconds, so
//! downstream consumers can reason about venue latency independently of
//! local processing delay.
//!
//! Grounded in the teacher's `orderbook/trade.rs` for the trade event
//! shape and its field-level doc density; the order-state DAG and bar
//! event are new (the teacher has no strategy or bar-aggregation layer),
//! modelled on the same plain-struct-plus-enum idiom.

use crate::bar::{BarKind, BarParam, CloseReason};
use crate::book::{Level, UpdateKind};
use crate::decimal::{Price, Quantity, Volume};
use crate::ids::{OrderId, SymbolId};

/// A single executed trade (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEvent {
    pub symbol: SymbolId,
    pub price: Price,
    pub quantity: Quantity,
    pub is_buy: bool,
    pub trade_id: u64,
    pub exchange_ts_ns: i64,
    pub recv_ts_ns: i64,
}

/// A book snapshot or delta (§3, §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct BookUpdateEvent {
    pub symbol: SymbolId,
    pub kind: UpdateKind,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub sequence_number: u64,
    pub exchange_ts_ns: i64,
    pub recv_ts_ns: i64,
}

/// A completed bar (§3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarEvent {
    pub symbol: SymbolId,
    pub bar_kind: BarKind,
    pub bar_param: BarParam,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
    pub buy_volume: Volume,
    pub trade_count: u64,
    pub start_ts_ns: i64,
    pub end_ts_ns: i64,
    pub close_reason: CloseReason,
}

/// Lifecycle status of an order (§3). Transitions form a DAG rooted at
/// `Submitted`, absorbing at `Filled`/`Canceled`/`Expired`/`Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Submitted,
    Accepted,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Canceled,
    Expired,
    Rejected,
    Replaced,
}

impl OrderStatus {
    /// Whether this status is one of the DAG's absorbing terminal states.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Expired | Self::Rejected
        )
    }
}

/// An order lifecycle notification (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Quantity filled by this particular event, when `status` reports a
    /// fill; zero otherwise.
    pub fill_quantity: Quantity,
    pub exchange_ts_ns: i64,
    pub recv_ts_ns: i64,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

/// Time-in-force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
    Day,
}

bitflags::bitflags! {
    /// Execution-instruction flags (§3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExecFlags: u8 {
        const REDUCE_ONLY   = 0b001;
        const POST_ONLY     = 0b010;
        const CLOSE_POSITION = 0b100;
    }
}

/// The full mutable state of one order (§3).
///
/// Invariant: `filled_quantity <= quantity`; `status` transitions only
/// along the DAG described by [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderState {
    pub id: OrderId,
    pub client_id: u64,
    pub exchange_order_id: Option<u64>,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub tif: TimeInForce,
    pub price: Price,
    pub trigger_price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub trailing_offset: Option<Price>,
    pub visible_quantity: Option<Quantity>,
    pub exec_flags: ExecFlags,
    pub parent_id: Option<OrderId>,
    pub status: OrderStatus,
    pub created_ts_ns: i64,
    pub last_update_ts_ns: i64,
}

impl OrderState {
    /// Whether `filled_quantity` has reached `quantity`.
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity.raw() >= self.quantity.raw()
    }

    /// Apply an [`OrderEvent`] for this order, folding in any additional
    /// fill quantity and updating status/timestamps.
    pub fn apply_event(&mut self, event: &OrderEvent) {
        debug_assert_eq!(self.id, event.order_id);
        if !event.fill_quantity.is_zero() {
            self.filled_quantity = self.filled_quantity + event.fill_quantity;
        }
        self.status = event.status;
        self.last_update_ts_ns = event.recv_ts_ns;
    }
}
