//! # Flox Core
//!
//! Event-distribution core for a low-latency trading framework: a
//! Disruptor-style single-producer, multi-consumer ring buffer; a
//! refcounted object pool for variable-size pooled events; a dense
//! N-level order book; an OHLCV bar aggregator with multi-timeframe
//! fan-out; cross-exchange composite book/position/clock aggregation and
//! order routing; a signal-emitting strategy runtime; and a fixed-layout
//! replay segment codec.
//!
//! ## Scope
//!
//! This crate owns event distribution, book/bar state, and the in-process
//! collaborators a strategy needs to route and reduce fills across
//! venues. It does not own order matching, execution-venue adaptors,
//! persistence beyond the ring buffer's own capacity, or cross-process
//! transport — those are external collaborators the embedding
//! application supplies.
//!
//! ## Module map
//!
//! - [`decimal`]: scaled fixed-point `Price`/`Quantity`/`Volume`.
//! - [`ids`]: dense integer identifiers and the symbol/exchange registry.
//! - [`pool`]: refcounted object pool and arena.
//! - [`bus`]: the SPMC ring buffer.
//! - [`book`]: the N-level order book.
//! - [`bar`]: OHLCV aggregation, multi-timeframe fan-out, bar history.
//! - [`composite`]: cross-exchange book/position/clock/routing.
//! - [`strategy`]: signal-emitting strategies, scratch state, OCO.
//! - [`lifecycle`]: subsystem start/stop and subscriber capability sets.
//! - [`events`]: the wire-level event and order-state types shared across
//!   every module above.
//! - [`replay`] (feature `journal`): the persisted segment/frame codec.

pub mod bar;
pub mod book;
pub mod bus;
pub mod composite;
pub mod decimal;
pub mod events;
pub mod ids;
pub mod lifecycle;
pub mod pool;
pub mod strategy;

#[cfg(feature = "journal")]
pub mod replay;

pub mod prelude;
