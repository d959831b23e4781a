//! Order router (§4.5): venue selection across registered executors,
//! with pluggable routing strategies and a failover policy for when the
//! selected venue turns out to be unavailable.
//!
//! The executor itself is out of scope (an execution-venue adaptor, per
//! `spec.md`'s non-goals); [`Executor`] is only the seam the router calls
//! through, grounded in the teacher's preference for small single-method
//! traits at integration boundaries (`orderbook/pool.rs`'s `Poolable`).

use super::book::CompositeBook;
use super::clock::ClockSync;
use super::error::RouterError;
use crate::bus::{Backoff, BackoffPolicy};
use crate::decimal::Price;
use crate::events::{OrderSide, OrderState};
use crate::ids::{ExchangeId, SymbolId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The out-of-scope collaborator an [`OrderRouter`] dispatches a selected
/// order to. Implementations live outside this crate.
pub trait Executor: Send + Sync {
    fn submit(&self, order: &OrderState);
}

/// How a candidate exchange is chosen among several (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// Prefer the exchange quoting the best price for the order's side.
    BestPrice,
    /// Prefer the exchange with the lowest estimated one-way latency.
    LowestLatency,
    /// Prefer the exchange quoting the largest size on the order's side.
    LargestSize,
    /// Cycle through the candidate list in order, one call per exchange.
    RoundRobin,
    /// Always pick the caller-supplied first candidate.
    Explicit,
}

/// What happens when the selected venue has no enabled executor (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverPolicy {
    /// Return an error to the caller immediately.
    Reject,
    /// Re-run selection over the remaining candidates.
    FailoverToBestAvailable,
    /// Poll with back-off until the venue becomes available or `timeout`
    /// elapses, then behave like `Reject`.
    NotifyAndWait { timeout: Duration },
}

struct ExchangeSlot {
    executor: Option<Arc<dyn Executor>>,
    enabled: AtomicBool,
}

/// Registered `{ExchangeId -> Executor}` table plus routing/failover
/// policy (§4.5).
pub struct OrderRouter {
    slots: Vec<ExchangeSlot>,
    strategy: RoutingStrategy,
    failover: FailoverPolicy,
    round_robin_cursor: AtomicUsize,
}

impl OrderRouter {
    pub fn new(max_exchanges: usize, strategy: RoutingStrategy, failover: FailoverPolicy) -> Self {
        Self {
            slots: (0..max_exchanges)
                .map(|_| ExchangeSlot {
                    executor: None,
                    enabled: AtomicBool::new(false),
                })
                .collect(),
            strategy,
            failover,
            round_robin_cursor: AtomicUsize::new(0),
        }
    }

    /// Register (or replace) the executor for `exchange`, enabling it.
    pub fn register_executor(&mut self, exchange: ExchangeId, executor: Arc<dyn Executor>) {
        let slot = &mut self.slots[exchange.index()];
        slot.executor = Some(executor);
        slot.enabled.store(true, Ordering::Release);
    }

    /// Enable or disable routing to an already-registered exchange.
    pub fn set_enabled(&self, exchange: ExchangeId, enabled: bool) {
        self.slots[exchange.index()].enabled.store(enabled, Ordering::Release);
    }

    fn available(&self, exchange: ExchangeId) -> Result<(), RouterError> {
        let slot = &self.slots[exchange.index()];
        if slot.executor.is_none() {
            return Err(RouterError::NoExecutor { exchange });
        }
        if !slot.enabled.load(Ordering::Acquire) {
            return Err(RouterError::ExchangeDisabled { exchange });
        }
        Ok(())
    }

    fn side_price(quote_bid: Price, quote_ask: Price, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => quote_ask,
            OrderSide::Sell => quote_bid,
        }
    }

    /// Rank `candidates` by this router's [`RoutingStrategy`] and return
    /// them best-first.
    fn ranked_candidates(
        &self,
        candidates: &[ExchangeId],
        symbol: SymbolId,
        side: OrderSide,
        book: &CompositeBook,
        clock: &ClockSync,
        now_ns: i64,
        max_staleness_ns: i64,
    ) -> Vec<ExchangeId> {
        match self.strategy {
            RoutingStrategy::Explicit => candidates.to_vec(),
            RoutingStrategy::RoundRobin => {
                if candidates.is_empty() {
                    return Vec::new();
                }
                let start = self.round_robin_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
                let mut ordered = candidates.to_vec();
                ordered.rotate_left(start);
                ordered
            }
            RoutingStrategy::BestPrice => {
                let mut scored: Vec<(ExchangeId, Option<i64>)> = candidates
                    .iter()
                    .map(|&ex| {
                        let price = book
                            .quotes(symbol, now_ns, max_staleness_ns)
                            .into_iter()
                            .find(|q| q.exchange == ex)
                            .map(|q| Self::side_price(q.best_bid, q.best_ask, side).raw());
                        (ex, price)
                    })
                    .collect();
                // Buy: cheapest ask first. Sell: highest bid first.
                scored.sort_by_key(|(_, price)| match (side, price) {
                    (_, None) => i64::MAX,
                    (OrderSide::Buy, Some(p)) => p,
                    (OrderSide::Sell, Some(p)) => -p,
                });
                scored.into_iter().map(|(ex, _)| ex).collect()
            }
            RoutingStrategy::LargestSize => {
                let mut scored: Vec<(ExchangeId, i64)> = candidates
                    .iter()
                    .map(|&ex| {
                        let qty = book
                            .quotes(symbol, now_ns, max_staleness_ns)
                            .into_iter()
                            .find(|q| q.exchange == ex)
                            .map(|q| match side {
                                OrderSide::Buy => q.ask_qty.raw(),
                                OrderSide::Sell => q.bid_qty.raw(),
                            })
                            .unwrap_or(0);
                        (ex, qty)
                    })
                    .collect();
                scored.sort_by_key(|(_, qty)| -qty);
                scored.into_iter().map(|(ex, _)| ex).collect()
            }
            RoutingStrategy::LowestLatency => {
                let mut scored: Vec<(ExchangeId, i64)> = candidates
                    .iter()
                    .map(|&ex| {
                        let latency = clock.estimate(ex).map(|e| e.latency_ns).unwrap_or(i64::MAX);
                        (ex, latency)
                    })
                    .collect();
                scored.sort_by_key(|(_, latency)| *latency);
                scored.into_iter().map(|(ex, _)| ex).collect()
            }
        }
    }

    /// Select one exchange from `candidates` per this router's strategy,
    /// apply the failover policy if it is unavailable, and submit `order`
    /// to its executor.
    pub fn route_and_submit(
        &self,
        symbol: SymbolId,
        candidates: &[ExchangeId],
        order: &OrderState,
        book: &CompositeBook,
        clock: &ClockSync,
        now_ns: i64,
        max_staleness_ns: i64,
    ) -> Result<ExchangeId, RouterError> {
        let ranked = self.ranked_candidates(candidates, symbol, order.side, book, clock, now_ns, max_staleness_ns);

        let mut last_err = RouterError::NoExecutor {
            exchange: *candidates.first().unwrap_or(&ExchangeId::new(0)),
        };

        for &exchange in &ranked {
            match self.available(exchange) {
                Ok(()) => {
                    self.slots[exchange.index()]
                        .executor
                        .as_ref()
                        .expect("checked available")
                        .submit(order);
                    return Ok(exchange);
                }
                Err(e) => {
                    last_err = e;
                    if matches!(self.failover, FailoverPolicy::Reject) {
                        return Err(last_err);
                    }
                    if let FailoverPolicy::NotifyAndWait { timeout } = self.failover {
                        if let Ok(()) = self.wait_for_available(exchange, timeout) {
                            self.slots[exchange.index()]
                                .executor
                                .as_ref()
                                .expect("checked available")
                                .submit(order);
                            return Ok(exchange);
                        }
                        return Err(last_err);
                    }
                    // FailoverToBestAvailable: continue to the next-ranked
                    // candidate.
                }
            }
        }

        Err(last_err)
    }

    fn wait_for_available(&self, exchange: ExchangeId, timeout: Duration) -> Result<(), RouterError> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Backoff::new(BackoffPolicy::Relaxed);
        loop {
            if self.available(exchange).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return self.available(exchange);
            }
            backoff.pause();
        }
    }
}
