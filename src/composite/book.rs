//! Composite (cross-exchange) top-of-book (§4.5).
//!
//! Grounded in the teacher's lock-free best-price caching in
//! `orderbook/book.rs` (an `AtomicU64`-backed best-tick cache read with
//! acquire and written with release): generalized here to one slot per
//! `(symbol, exchange)` pair so many single-writer exchange feeds can
//! update concurrently while readers compute a cross-exchange composite
//! without ever taking a lock.

use crate::decimal::{Price, Quantity};
use crate::ids::{ExchangeId, SymbolId};
use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};

const NO_BID: i64 = i64::MIN;
const NO_ASK: i64 = i64::MAX;
const NEVER_UPDATED: i64 = i64::MIN;

struct ExchangeSlot {
    best_bid_raw: CachePadded<AtomicI64>,
    best_ask_raw: CachePadded<AtomicI64>,
    bid_qty_raw: AtomicI64,
    ask_qty_raw: AtomicI64,
    update_ts_ns: AtomicI64,
}

impl ExchangeSlot {
    fn empty() -> Self {
        Self {
            best_bid_raw: CachePadded::new(AtomicI64::new(NO_BID)),
            best_ask_raw: CachePadded::new(AtomicI64::new(NO_ASK)),
            bid_qty_raw: AtomicI64::new(0),
            ask_qty_raw: AtomicI64::new(0),
            update_ts_ns: AtomicI64::new(NEVER_UPDATED),
        }
    }
}

/// One exchange's top-of-book contribution to a composite read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeQuote {
    pub exchange: ExchangeId,
    pub best_bid: Price,
    pub best_ask: Price,
    pub bid_qty: Quantity,
    pub ask_qty: Quantity,
    pub update_ts_ns: i64,
}

/// The cross-exchange composite top-of-book for one symbol (§4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeQuote {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
}

/// `MaxExchanges` per-symbol top-of-book slots, one per registered
/// exchange, updated by a single writer per exchange and read by any
/// number of readers without locking (§4.5).
pub struct CompositeBook {
    max_exchanges: usize,
    slots: Vec<ExchangeSlot>,
}

impl CompositeBook {
    pub fn new(max_symbols: usize, max_exchanges: usize) -> Self {
        let total = max_symbols * max_exchanges;
        Self {
            max_exchanges,
            slots: (0..total).map(|_| ExchangeSlot::empty()).collect(),
        }
    }

    fn index(&self, symbol: SymbolId, exchange: ExchangeId) -> usize {
        symbol.index() * self.max_exchanges + exchange.index()
    }

    /// Record exchange `exchange`'s current top-of-book for `symbol`.
    /// The sole writer for a given `exchange` may call this from any
    /// thread; concurrent writers for *different* exchanges never
    /// contend, since each owns a disjoint slot.
    pub fn update(
        &self,
        symbol: SymbolId,
        exchange: ExchangeId,
        best_bid: Price,
        best_ask: Price,
        bid_qty: Quantity,
        ask_qty: Quantity,
        now_ns: i64,
    ) {
        let slot = &self.slots[self.index(symbol, exchange)];
        slot.bid_qty_raw.store(bid_qty.raw(), Ordering::Relaxed);
        slot.ask_qty_raw.store(ask_qty.raw(), Ordering::Relaxed);
        slot.best_bid_raw.store(best_bid.raw(), Ordering::Relaxed);
        slot.best_ask_raw.store(best_ask.raw(), Ordering::Relaxed);
        slot.update_ts_ns.store(now_ns, Ordering::Release);
    }

    fn quote(&self, symbol: SymbolId, exchange: ExchangeId) -> Option<ExchangeQuote> {
        let slot = &self.slots[self.index(symbol, exchange)];
        let update_ts_ns = slot.update_ts_ns.load(Ordering::Acquire);
        if update_ts_ns == NEVER_UPDATED {
            return None;
        }
        let best_bid_raw = slot.best_bid_raw.load(Ordering::Relaxed);
        let best_ask_raw = slot.best_ask_raw.load(Ordering::Relaxed);
        let bid_qty_raw = slot.bid_qty_raw.load(Ordering::Relaxed);
        let ask_qty_raw = slot.ask_qty_raw.load(Ordering::Relaxed);
        Some(ExchangeQuote {
            exchange,
            best_bid: Price::from_raw(best_bid_raw),
            best_ask: Price::from_raw(best_ask_raw),
            bid_qty: Quantity::from_raw(bid_qty_raw),
            ask_qty: Quantity::from_raw(ask_qty_raw),
            update_ts_ns,
        })
    }

    /// Every non-stale exchange quote currently on file for `symbol`.
    pub fn quotes(&self, symbol: SymbolId, now_ns: i64, max_staleness_ns: i64) -> Vec<ExchangeQuote> {
        (0..self.max_exchanges)
            .filter_map(|e| self.quote(symbol, ExchangeId::new(e as u8)))
            .filter(|q| now_ns - q.update_ts_ns <= max_staleness_ns)
            .collect()
    }

    /// The composite best bid/ask across all non-stale exchanges:
    /// `best_bid = max(bid)`, `best_ask = min(ask)` (§4.5).
    pub fn composite(&self, symbol: SymbolId, now_ns: i64, max_staleness_ns: i64) -> CompositeQuote {
        let quotes = self.quotes(symbol, now_ns, max_staleness_ns);
        let best_bid = quotes.iter().map(|q| q.best_bid).max_by_key(|p| p.raw());
        let best_ask = quotes.iter().map(|q| q.best_ask).min_by_key(|p| p.raw());
        CompositeQuote { best_bid, best_ask }
    }

    /// Whether the composite book is crossed: some exchange's bid beats
    /// another exchange's ask.
    pub fn has_arbitrage(&self, symbol: SymbolId, now_ns: i64, max_staleness_ns: i64) -> bool {
        let composite = self.composite(symbol, now_ns, max_staleness_ns);
        match (composite.best_bid, composite.best_ask) {
            (Some(bid), Some(ask)) => bid.raw() > ask.raw(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(v: f64) -> Price {
        Price::from_f64(v, Price::from_raw(1_000_000))
    }

    fn qty(v: f64) -> Quantity {
        Quantity::from_f64(v, Quantity::from_raw(1))
    }

    #[test]
    fn composite_best_is_max_bid_min_ask_across_exchanges() {
        let book = CompositeBook::new(2, 3);
        let sym = SymbolId::new(0);
        book.update(sym, ExchangeId::new(0), px(100.0), px(100.5), qty(1.0), qty(1.0), 0);
        book.update(sym, ExchangeId::new(1), px(100.2), px(100.4), qty(1.0), qty(1.0), 0);

        let composite = book.composite(sym, 0, 1_000_000_000);
        assert_eq!(composite.best_bid.unwrap().to_f64(), 100.2);
        assert_eq!(composite.best_ask.unwrap().to_f64(), 100.4);
    }

    #[test]
    fn stale_exchange_quotes_are_excluded() {
        let book = CompositeBook::new(1, 2);
        let sym = SymbolId::new(0);
        book.update(sym, ExchangeId::new(0), px(100.0), px(100.5), qty(1.0), qty(1.0), 0);
        book.update(sym, ExchangeId::new(1), px(101.0), px(101.1), qty(1.0), qty(1.0), 0);

        // Only exchange 0 is within the staleness window as of now_ns=2000.
        let composite = book.composite(sym, 2_000, 1_000);
        assert_eq!(composite.best_bid.unwrap().to_f64(), 100.0);
        assert_eq!(composite.best_ask.unwrap().to_f64(), 100.5);
    }

    #[test]
    fn arbitrage_detected_when_one_exchanges_bid_beats_anothers_ask() {
        let book = CompositeBook::new(1, 2);
        let sym = SymbolId::new(0);
        book.update(sym, ExchangeId::new(0), px(100.5), px(100.6), qty(1.0), qty(1.0), 0);
        book.update(sym, ExchangeId::new(1), px(100.0), px(100.4), qty(1.0), qty(1.0), 0);
        assert!(book.has_arbitrage(sym, 0, 1_000_000_000));
    }

    #[test]
    fn no_quotes_yet_has_no_composite() {
        let book = CompositeBook::new(1, 1);
        let composite = book.composite(SymbolId::new(0), 0, 1_000);
        assert!(composite.best_bid.is_none());
        assert!(composite.best_ask.is_none());
    }
}
