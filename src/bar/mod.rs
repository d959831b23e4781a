//! Bar aggregation: folding trades into OHLCV bars under a pluggable
//! close policy (§4.4), fanning one trade into several independent
//! timeframes, and a small ring-backed history for each (symbol,
//! timeframe) pair.

mod bar;
mod error;
mod policy;

pub use bar::{Bar, BarKind, BarParam, CloseReason};
pub use error::BarError;
pub use policy::{
    ClosePolicy, HeikinAshiPolicy, RangePolicy, RenkoPolicy, TickPolicy, TimePolicy, VolumePolicy,
};

use crate::events::{BarEvent, TradeEvent};
use crate::ids::SymbolId;
use std::collections::HashMap;

fn bar_to_event(bar: &Bar) -> BarEvent {
    BarEvent {
        symbol: bar.symbol,
        bar_kind: BarKind::Time, // overwritten by caller with the real kind
        bar_param: BarParam::IntervalNs(0),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
        buy_volume: bar.buy_volume,
        trade_count: bar.trade_count,
        start_ts_ns: bar.start_ts_ns,
        end_ts_ns: bar.end_ts_ns,
        close_reason: bar.close_reason,
    }
}

/// Per-symbol single-timeframe bar aggregator (§4.4).
///
/// Symbols below the configured `max_symbols` ceiling live in a dense
/// `Vec`; any symbol beyond it overflows into a `HashMap`. All six
/// reference policies are small `Copy` value types, so the overflow tail
/// is always enabled here rather than gated by a type-level
/// movable/non-movable distinction — see `DESIGN.md`.
pub struct BarAggregator<P: ClosePolicy> {
    policy_template: P,
    dense: Vec<Option<(Bar, P)>>,
    overflow: HashMap<SymbolId, (Bar, P)>,
}

impl<P: ClosePolicy> BarAggregator<P> {
    pub fn new(policy_template: P, max_symbols: usize) -> Self {
        Self {
            policy_template,
            dense: (0..max_symbols).map(|_| None).collect(),
            overflow: HashMap::new(),
        }
    }

    fn slot_mut(&mut self, symbol: SymbolId) -> &mut Option<(Bar, P)> {
        let idx = symbol.index();
        if idx < self.dense.len() {
            &mut self.dense[idx]
        } else {
            self.overflow.entry(symbol).or_insert(None)
        }
    }

    /// Fold one trade in, returning any bar(s) it closed. A policy whose
    /// [`ClosePolicy::split_boundary`] reports a fixed price step (Renko)
    /// can close several bricks from one large-gap trade; every such
    /// [`BarEvent`] is returned, in order.
    pub fn on_trade(&mut self, trade: &TradeEvent) -> Vec<BarEvent> {
        let mut out = Vec::new();
        let template = self.policy_template.clone();
        let slot = self.slot_mut(trade.symbol);

        if slot.is_none() {
            let mut policy = template;
            let mut bar = Bar::opened(trade.symbol, trade.price, trade.exchange_ts_ns);
            policy.init_bar(trade, &mut bar);
            policy.update(trade, &mut bar);
            *slot = Some((bar, policy));
            return out;
        }

        let (bar, policy) = slot.as_mut().unwrap();

        if P::PRE_CLOSE {
            if policy.should_close(trade, bar) {
                bar.close_reason = CloseReason::Threshold;
                if let Some(ts) = policy.close_ts(bar) {
                    bar.end_ts_ns = ts;
                }
                out.push(tag_event(bar_to_event(bar), policy));
                policy.on_close(bar);
                let mut new_bar = Bar::opened(trade.symbol, trade.price, trade.exchange_ts_ns);
                policy.init_bar(trade, &mut new_bar);
                policy.update(trade, &mut new_bar);
                *bar = new_bar;
            } else {
                policy.update(trade, bar);
            }
            return out;
        }

        if let Some(mut boundary) = policy.split_boundary(trade, bar) {
            loop {
                bar.close = boundary;
                if boundary.raw() >= bar.open.raw() {
                    bar.high = boundary;
                } else {
                    bar.low = boundary;
                }
                bar.close_reason = CloseReason::Threshold;
                out.push(tag_event(bar_to_event(bar), policy));
                policy.on_close(bar);
                let mut new_bar = Bar::opened(trade.symbol, boundary, trade.exchange_ts_ns);
                policy.init_bar(trade, &mut new_bar);
                *bar = new_bar;
                match policy.split_boundary(trade, bar) {
                    Some(next) => boundary = next,
                    None => break,
                }
            }
            policy.update(trade, bar);
            if policy.should_close(trade, bar) {
                bar.close_reason = CloseReason::Threshold;
                out.push(tag_event(bar_to_event(bar), policy));
                policy.on_close(bar);
                let mut new_bar = Bar::opened(trade.symbol, trade.price, trade.exchange_ts_ns);
                policy.init_bar(trade, &mut new_bar);
                *bar = new_bar;
            }
            return out;
        }

        policy.update(trade, bar);
        if policy.should_close(trade, bar) {
            bar.close_reason = CloseReason::Threshold;
            out.push(tag_event(bar_to_event(bar), policy));
            policy.on_close(bar);
            let mut new_bar = Bar::opened(trade.symbol, trade.price, trade.exchange_ts_ns);
            policy.init_bar(trade, &mut new_bar);
            *bar = new_bar;
        }
        out
    }

    /// Force-close any open bar for `symbol`, e.g. on an end-of-session
    /// flush. Returns `None` if no bar was open.
    pub fn force_close(&mut self, symbol: SymbolId) -> Option<BarEvent> {
        let slot = self.slot_mut(symbol);
        let (mut bar, mut policy) = slot.take()?;
        bar.close_reason = CloseReason::Forced;
        policy.on_close(&bar);
        Some(tag_event(bar_to_event(&bar), &policy))
    }
}

fn tag_event<P: ClosePolicy>(mut event: BarEvent, policy: &P) -> BarEvent {
    event.bar_kind = policy.kind();
    event.bar_param = policy.param();
    event
}

/// Object-safe handle to one timeframe slot inside a
/// [`MultiTimeframeAggregator`], letting heterogeneous concrete
/// [`ClosePolicy`] types share one fan-out (§4.4: "fans one trade into up
/// to MaxTimeframes independent policy instances").
pub trait TimeframeSlot: Send {
    fn on_trade(&mut self, trade: &TradeEvent) -> Vec<BarEvent>;
}

impl<P: ClosePolicy + Send + 'static> TimeframeSlot for BarAggregator<P> {
    fn on_trade(&mut self, trade: &TradeEvent) -> Vec<BarEvent> {
        BarAggregator::on_trade(self, trade)
    }
}

/// Fans one trade into up to `MAX_TF` independently configured timeframe
/// aggregators (§4.4).
pub struct MultiTimeframeAggregator {
    max_timeframes: usize,
    slots: Vec<Box<dyn TimeframeSlot>>,
}

impl MultiTimeframeAggregator {
    pub fn new(max_timeframes: usize) -> Self {
        Self {
            max_timeframes,
            slots: Vec::new(),
        }
    }

    /// Register one more timeframe. `slot` is typically a
    /// `BarAggregator<SomePolicy>` boxed as a [`TimeframeSlot`].
    pub fn subscribe_timeframe(
        &mut self,
        slot: Box<dyn TimeframeSlot>,
    ) -> Result<(), BarError> {
        if self.slots.len() >= self.max_timeframes {
            return Err(BarError::TimeframeCapacity {
                max_timeframes: self.max_timeframes,
            });
        }
        self.slots.push(slot);
        Ok(())
    }

    /// Feed one trade to every registered timeframe, flattening whatever
    /// bars each one closes.
    pub fn on_trade(&mut self, trade: &TradeEvent) -> Vec<BarEvent> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            out.extend(slot.on_trade(trade));
        }
        out
    }

    pub fn timeframe_count(&self) -> usize {
        self.slots.len()
    }
}

/// Fixed-depth ring history of completed bars per (symbol, timeframe)
/// pair, addressed by a caller-assigned dense `timeframe_index` (§4.4).
///
/// Backed by one flat `Vec` of size `max_symbols * max_timeframes * depth`
/// so `bar(symbol, timeframe_index, lookback)` is an O(1) index
/// computation rather than a nested-container lookup.
pub struct BarMatrix {
    max_symbols: usize,
    max_timeframes: usize,
    depth: usize,
    slots: Vec<Option<BarEvent>>,
    cursors: Vec<usize>,
}

impl BarMatrix {
    pub fn new(max_symbols: usize, max_timeframes: usize, depth: usize) -> Self {
        assert!(depth > 0, "depth must be positive");
        let total = max_symbols * max_timeframes * depth;
        Self {
            max_symbols,
            max_timeframes,
            depth,
            slots: (0..total).map(|_| None).collect(),
            cursors: vec![0; max_symbols * max_timeframes],
        }
    }

    fn cell_base(&self, symbol: SymbolId, timeframe_index: usize) -> usize {
        let cell = symbol.index() * self.max_timeframes + timeframe_index;
        cell * self.depth
    }

    fn cursor_index(&self, symbol: SymbolId, timeframe_index: usize) -> usize {
        symbol.index() * self.max_timeframes + timeframe_index
    }

    /// Record a newly completed bar for `(symbol, timeframe_index)`.
    pub fn push(&mut self, symbol: SymbolId, timeframe_index: usize, bar: BarEvent) {
        debug_assert!(symbol.index() < self.max_symbols);
        debug_assert!(timeframe_index < self.max_timeframes);
        let cursor_idx = self.cursor_index(symbol, timeframe_index);
        let slot_in_ring = self.cursors[cursor_idx];
        let base = self.cell_base(symbol, timeframe_index);
        self.slots[base + slot_in_ring] = Some(bar);
        self.cursors[cursor_idx] = (slot_in_ring + 1) % self.depth;
    }

    /// The bar `lookback` closes ago for `(symbol, timeframe_index)`;
    /// `lookback == 0` is the most recently closed bar. `None` if fewer
    /// than `lookback + 1` bars have been recorded yet.
    pub fn bar(&self, symbol: SymbolId, timeframe_index: usize, lookback: usize) -> Option<&BarEvent> {
        if lookback >= self.depth {
            return None;
        }
        let cursor_idx = self.cursor_index(symbol, timeframe_index);
        let next_write = self.cursors[cursor_idx];
        let slot_in_ring = (next_write + self.depth - 1 - lookback) % self.depth;
        let base = self.cell_base(symbol, timeframe_index);
        self.slots[base + slot_in_ring].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Price, Quantity};

    fn tick() -> Price {
        Price::from_raw(1_000_000) // 0.01
    }

    fn trade(symbol: SymbolId, price: f64, qty: f64, is_buy: bool, ts_ns: i64) -> TradeEvent {
        TradeEvent {
            symbol,
            price: Price::from_f64(price, tick()),
            quantity: Quantity::from_f64(qty, Quantity::from_raw(1)),
            is_buy,
            trade_id: ts_ns as u64,
            exchange_ts_ns: ts_ns,
            recv_ts_ns: ts_ns,
        }
    }

    #[test]
    fn time_policy_closes_on_interval_and_opens_next_bar() {
        let sym = SymbolId::new(0);
        let mut agg = BarAggregator::new(
            TimePolicy {
                interval_ns: 60_000_000_000,
            },
            4,
        );

        assert!(agg.on_trade(&trade(sym, 100.00, 2.0, true, 0)).is_empty());
        assert!(agg.on_trade(&trade(sym, 100.50, 1.0, true, 30_000_000_000)).is_empty());
        let closed = agg.on_trade(&trade(sym, 101.00, 3.0, true, 59_000_000_000));
        assert!(closed.is_empty());

        // This trade lands exactly at the 60s boundary: it closes the
        // first bar (pre-close) and opens the second.
        let closed = agg.on_trade(&trade(sym, 99.00, 1.0, false, 61_000_000_000));
        assert_eq!(closed.len(), 1);
        let bar = &closed[0];
        assert_eq!(bar.open.to_f64(), 100.00);
        assert_eq!(bar.high.to_f64(), 101.00);
        assert_eq!(bar.low.to_f64(), 100.00);
        assert_eq!(bar.close.to_f64(), 101.00);
        assert_eq!(bar.trade_count, 3);
        assert_eq!(bar.start_ts_ns, 0);
        assert_eq!(bar.end_ts_ns, 60_000_000_000);
        assert_eq!(bar.close_reason, CloseReason::Threshold);
        assert_eq!(bar.bar_kind, BarKind::Time);
    }

    #[test]
    fn heikin_ashi_smooths_open_from_the_prior_bar() {
        let sym = SymbolId::new(0);
        let mut agg = BarAggregator::new(HeikinAshiPolicy::new(60_000_000_000), 4);

        agg.on_trade(&trade(sym, 100.0, 1.0, true, 0));
        agg.on_trade(&trade(sym, 102.0, 1.0, true, 30_000_000_000));
        let closed = agg.on_trade(&trade(sym, 98.0, 1.0, true, 61_000_000_000));
        assert_eq!(closed.len(), 1);
        // First bar has no prior HA state, so its HA-open is the raw open.
        assert_eq!(closed[0].open.to_f64(), 100.0);
        assert_eq!(closed[0].bar_kind, BarKind::HeikinAshi);

        let closed = agg.on_trade(&trade(sym, 50.0, 1.0, true, 130_000_000_000));
        assert_eq!(closed.len(), 1);
        // Second bar's HA-open is the average of the first bar's HA
        // open (100.0) and HA close (101.0).
        assert_eq!(closed[0].open.to_f64(), 100.5);
    }

    #[test]
    fn tick_policy_closes_post_trade_after_n_trades() {
        let sym = SymbolId::new(0);
        let mut agg = BarAggregator::new(TickPolicy { n: 3 }, 4);

        assert!(agg.on_trade(&trade(sym, 10.0, 1.0, true, 0)).is_empty());
        assert!(agg.on_trade(&trade(sym, 10.1, 1.0, true, 1)).is_empty());
        let closed = agg.on_trade(&trade(sym, 10.2, 1.0, true, 2));
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].trade_count, 3);
        assert_eq!(closed[0].close.to_f64(), 10.2);

        // A new bar opened by the next trade.
        assert!(agg.on_trade(&trade(sym, 10.3, 1.0, true, 3)).is_empty());
    }

    #[test]
    fn range_policy_closes_when_high_low_spread_reached() {
        let sym = SymbolId::new(0);
        let mut agg = BarAggregator::new(
            RangePolicy {
                range: Price::from_f64(1.0, tick()),
            },
            4,
        );
        assert!(agg.on_trade(&trade(sym, 100.0, 1.0, true, 0)).is_empty());
        assert!(agg.on_trade(&trade(sym, 100.5, 1.0, true, 1)).is_empty());
        let closed = agg.on_trade(&trade(sym, 101.0, 1.0, true, 2));
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].high.to_f64(), 101.0);
        assert_eq!(closed[0].low.to_f64(), 100.0);
    }

    #[test]
    fn renko_policy_can_emit_multiple_bricks_from_one_trade() {
        let sym = SymbolId::new(0);
        let mut agg = BarAggregator::new(
            RenkoPolicy {
                brick: Price::from_f64(1.0, tick()),
            },
            4,
        );
        assert!(agg.on_trade(&trade(sym, 100.0, 1.0, true, 0)).is_empty());
        // A 3-unit jump should close three bricks in one call.
        let closed = agg.on_trade(&trade(sym, 103.0, 1.0, true, 1));
        assert_eq!(closed.len(), 3);
        assert_eq!(closed[0].close.to_f64(), 101.0);
        assert_eq!(closed[1].close.to_f64(), 102.0);
        assert_eq!(closed[2].close.to_f64(), 103.0);
    }

    #[test]
    fn overflow_symbol_beyond_dense_ceiling_still_aggregates() {
        let sym = SymbolId::new(10); // dense ceiling is 4
        let mut agg = BarAggregator::new(TickPolicy { n: 2 }, 4);
        assert!(agg.on_trade(&trade(sym, 5.0, 1.0, true, 0)).is_empty());
        let closed = agg.on_trade(&trade(sym, 5.1, 1.0, true, 1));
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn multi_timeframe_fans_one_trade_into_every_slot() {
        let sym = SymbolId::new(0);
        let mut multi = MultiTimeframeAggregator::new(2);
        multi
            .subscribe_timeframe(Box::new(BarAggregator::new(TickPolicy { n: 2 }, 4)))
            .unwrap();
        multi
            .subscribe_timeframe(Box::new(BarAggregator::new(TickPolicy { n: 3 }, 4)))
            .unwrap();

        assert!(multi.on_trade(&trade(sym, 1.0, 1.0, true, 0)).is_empty());
        let closed = multi.on_trade(&trade(sym, 1.1, 1.0, true, 1));
        // Only the 2-tick timeframe closes here.
        assert_eq!(closed.len(), 1);

        let closed = multi.on_trade(&trade(sym, 1.2, 1.0, true, 2));
        // Only the 3-tick timeframe closes here.
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn subscribe_timeframe_enforces_capacity() {
        let mut multi = MultiTimeframeAggregator::new(1);
        multi
            .subscribe_timeframe(Box::new(BarAggregator::new(TickPolicy { n: 1 }, 2)))
            .unwrap();
        let err = multi
            .subscribe_timeframe(Box::new(BarAggregator::new(TickPolicy { n: 1 }, 2)))
            .unwrap_err();
        assert!(matches!(err, BarError::TimeframeCapacity { max_timeframes: 1 }));
    }

    #[test]
    fn bar_matrix_lookback_returns_most_recent_first() {
        let sym = SymbolId::new(0);
        let mut matrix = BarMatrix::new(4, 2, 3);
        for i in 0..3 {
            let mut bar = trade_bar(sym, 100.0 + i as f64, i);
            bar.end_ts_ns = i;
            matrix.push(sym, 0, bar);
        }
        assert_eq!(matrix.bar(sym, 0, 0).unwrap().open.to_f64(), 102.0);
        assert_eq!(matrix.bar(sym, 0, 1).unwrap().open.to_f64(), 101.0);
        assert_eq!(matrix.bar(sym, 0, 2).unwrap().open.to_f64(), 100.0);
        assert!(matrix.bar(sym, 0, 3).is_none());
    }

    fn trade_bar(symbol: SymbolId, open: f64, seq: i64) -> BarEvent {
        BarEvent {
            symbol,
            bar_kind: BarKind::Time,
            bar_param: BarParam::IntervalNs(0),
            open: Price::from_f64(open, tick()),
            high: Price::from_f64(open, tick()),
            low: Price::from_f64(open, tick()),
            close: Price::from_f64(open, tick()),
            volume: crate::decimal::Volume::ZERO,
            buy_volume: crate::decimal::Volume::ZERO,
            trade_count: 1,
            start_ts_ns: seq,
            end_ts_ns: seq,
            close_reason: CloseReason::Threshold,
        }
    }
}
