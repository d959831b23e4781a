//! Bar-close policies (§4.4): reference implementations of the
//! `init_bar`/`update`/`should_close` contract.

use super::bar::{Bar, BarKind, BarParam};
use crate::decimal::{Price, Volume};
use crate::events::TradeEvent;

/// A bar-close policy. `should_close` is consulted either before or
/// after the triggering trade is folded in, according to
/// [`ClosePolicy::PRE_CLOSE`] — pre-close for Time (so the closing trade
/// opens the next bar instead of belonging to the one it closed), post
/// for everything else (§4.4).
pub trait ClosePolicy: Clone {
    /// Whether `should_close` is evaluated before `update` (true) or
    /// after (false, the default-shaped behaviour for most policies).
    const PRE_CLOSE: bool = false;

    fn kind(&self) -> BarKind;
    fn param(&self) -> BarParam;

    /// Stamp any policy-specific seed state into a freshly opened bar.
    fn init_bar(&mut self, trade: &TradeEvent, bar: &mut Bar);

    /// Called once a bar closes, before the replacement bar is opened,
    /// so a policy can carry state forward (Heikin-Ashi's smoothing
    /// seed). No-op by default.
    fn on_close(&mut self, _closed_bar: &Bar) {}

    /// Fold one trade into the bar's OHLCV fields and any policy state.
    fn update(&mut self, trade: &TradeEvent, bar: &mut Bar) {
        bar.high = max_price(bar.high, trade.price);
        bar.low = min_price(bar.low, trade.price);
        bar.close = trade.price;
        let notional = trade.price * trade.quantity;
        bar.volume = bar.volume + notional;
        if trade.is_buy {
            bar.buy_volume = bar.buy_volume + notional;
        }
        bar.trade_count += 1;
        bar.end_ts_ns = trade.exchange_ts_ns;
    }

    /// Whether the bar is complete.
    fn should_close(&mut self, trade: &TradeEvent, bar: &Bar) -> bool;

    /// For policies whose close boundary is a fixed price step rather
    /// than the live trade print (Renko), the next boundary price
    /// reachable from `bar`'s current open given `trade`'s direction, or
    /// `None` if this policy closes bars at the trade price itself. The
    /// aggregator steps through every boundary returned here before
    /// folding the trade's own OHLCV contribution into the final bar,
    /// so one large-gap trade can close several bricks at once.
    fn split_boundary(&self, _trade: &TradeEvent, _bar: &Bar) -> Option<Price> {
        None
    }

    /// For policies whose close boundary is a scheduled time rather than
    /// the triggering trade's own timestamp (Time, Heikin-Ashi), the
    /// boundary timestamp to stamp onto `end_ts_ns` when `bar` closes.
    /// `None` (the default) means stamp the last folded trade's
    /// timestamp instead, correct for every policy whose close coincides
    /// with the trade that triggers it.
    fn close_ts(&self, _bar: &Bar) -> Option<i64> {
        None
    }
}

fn max_price(a: Price, b: Price) -> Price {
    if a.raw() >= b.raw() { a } else { b }
}

fn min_price(a: Price, b: Price) -> Price {
    if a.raw() <= b.raw() { a } else { b }
}

/// Closes when `trade.exchange_ts_ns >= bar.start_ts_ns + interval`.
/// Pre-close: the triggering trade belongs to the *next* bar.
#[derive(Debug, Clone, Copy)]
pub struct TimePolicy {
    pub interval_ns: i64,
}

impl ClosePolicy for TimePolicy {
    const PRE_CLOSE: bool = true;

    fn kind(&self) -> BarKind {
        BarKind::Time
    }

    fn param(&self) -> BarParam {
        BarParam::IntervalNs(self.interval_ns)
    }

    fn init_bar(&mut self, _trade: &TradeEvent, _bar: &mut Bar) {}

    fn should_close(&mut self, trade: &TradeEvent, bar: &Bar) -> bool {
        trade.exchange_ts_ns >= bar.start_ts_ns + self.interval_ns
    }

    fn close_ts(&self, bar: &Bar) -> Option<i64> {
        Some(bar.start_ts_ns + self.interval_ns)
    }
}

/// Closes once `bar.trade_count >= n` (post-close).
#[derive(Debug, Clone, Copy)]
pub struct TickPolicy {
    pub n: u64,
}

impl ClosePolicy for TickPolicy {
    fn kind(&self) -> BarKind {
        BarKind::Tick
    }

    fn param(&self) -> BarParam {
        BarParam::TradeCount(self.n)
    }

    fn init_bar(&mut self, _trade: &TradeEvent, _bar: &mut Bar) {}

    fn should_close(&mut self, _trade: &TradeEvent, bar: &Bar) -> bool {
        bar.trade_count >= self.n
    }
}

/// Closes once notional volume reaches `threshold` (post-close).
#[derive(Debug, Clone, Copy)]
pub struct VolumePolicy {
    pub threshold: Volume,
}

impl ClosePolicy for VolumePolicy {
    fn kind(&self) -> BarKind {
        BarKind::Volume
    }

    fn param(&self) -> BarParam {
        BarParam::VolumeThreshold(self.threshold)
    }

    fn init_bar(&mut self, _trade: &TradeEvent, _bar: &mut Bar) {}

    fn should_close(&mut self, _trade: &TradeEvent, bar: &Bar) -> bool {
        bar.volume.raw() >= self.threshold.raw()
    }
}

/// Closes once `high - low >= range` (post-close).
#[derive(Debug, Clone, Copy)]
pub struct RangePolicy {
    pub range: Price,
}

impl ClosePolicy for RangePolicy {
    fn kind(&self) -> BarKind {
        BarKind::Range
    }

    fn param(&self) -> BarParam {
        BarParam::RangeTicks(self.range)
    }

    fn init_bar(&mut self, _trade: &TradeEvent, _bar: &mut Bar) {}

    fn should_close(&mut self, _trade: &TradeEvent, bar: &Bar) -> bool {
        bar.high.raw() - bar.low.raw() >= self.range.raw()
    }
}

/// Closes on a price move of `±brick` from the last close. The
/// aggregator (not this trait) is responsible for emitting multiple
/// bricks from one large-gap trade, since a single `should_close` call
/// can only report one boundary at a time (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct RenkoPolicy {
    pub brick: Price,
}

impl ClosePolicy for RenkoPolicy {
    fn kind(&self) -> BarKind {
        BarKind::Renko
    }

    fn param(&self) -> BarParam {
        BarParam::BrickSize(self.brick)
    }

    fn init_bar(&mut self, _trade: &TradeEvent, _bar: &mut Bar) {}

    fn should_close(&mut self, trade: &TradeEvent, bar: &Bar) -> bool {
        (trade.price.raw() - bar.open.raw()).abs() >= self.brick.raw()
    }

    fn split_boundary(&self, trade: &TradeEvent, bar: &Bar) -> Option<Price> {
        if trade.price.raw() > bar.open.raw() {
            Some(Price::from_raw(bar.open.raw() + self.brick.raw()))
        } else if trade.price.raw() < bar.open.raw() {
            Some(Price::from_raw(bar.open.raw() - self.brick.raw()))
        } else {
            None
        }
    }
}

/// Timed like [`TimePolicy`], but `init_bar`/`update` maintain a smoothed
/// Heikin-Ashi open/close derived from the previous bar instead of the
/// raw trade prices.
#[derive(Debug, Clone, Copy)]
pub struct HeikinAshiPolicy {
    pub interval_ns: i64,
    prev_ha_open: Option<Price>,
    prev_ha_close: Option<Price>,
}

impl HeikinAshiPolicy {
    pub fn new(interval_ns: i64) -> Self {
        Self {
            interval_ns,
            prev_ha_open: None,
            prev_ha_close: None,
        }
    }

    fn smoothed_open(&self, raw_open: Price) -> Price {
        match (self.prev_ha_open, self.prev_ha_close) {
            (Some(po), Some(pc)) => {
                Price::from_raw(crate::decimal::round_half_even_div(
                    po.raw() as i128 + pc.raw() as i128,
                    2,
                ) as i64)
            }
            _ => raw_open,
        }
    }
}

impl ClosePolicy for HeikinAshiPolicy {
    const PRE_CLOSE: bool = true;

    fn kind(&self) -> BarKind {
        BarKind::HeikinAshi
    }

    fn param(&self) -> BarParam {
        BarParam::IntervalNs(self.interval_ns)
    }

    fn init_bar(&mut self, trade: &TradeEvent, bar: &mut Bar) {
        bar.open = self.smoothed_open(trade.price);
        bar.high = bar.open;
        bar.low = bar.open;
        bar.close = bar.open;
    }

    fn update(&mut self, trade: &TradeEvent, bar: &mut Bar) {
        let raw_close = trade.price;
        let ha_close = Price::from_raw(
            crate::decimal::round_half_even_div(
                bar.open.raw() as i128 + raw_close.raw() as i128,
                2,
            ) as i64,
        );
        bar.high = max_price(bar.high, raw_close);
        bar.low = min_price(bar.low, raw_close);
        bar.close = ha_close;
        let notional = trade.price * trade.quantity;
        bar.volume = bar.volume + notional;
        if trade.is_buy {
            bar.buy_volume = bar.buy_volume + notional;
        }
        bar.trade_count += 1;
        bar.end_ts_ns = trade.exchange_ts_ns;
    }

    fn should_close(&mut self, trade: &TradeEvent, bar: &Bar) -> bool {
        trade.exchange_ts_ns >= bar.start_ts_ns + self.interval_ns
    }

    fn close_ts(&self, bar: &Bar) -> Option<i64> {
        Some(bar.start_ts_ns + self.interval_ns)
    }

    fn on_close(&mut self, closed_bar: &Bar) {
        self.prev_ha_open = Some(closed_bar.open);
        self.prev_ha_close = Some(closed_bar.close);
    }
}
