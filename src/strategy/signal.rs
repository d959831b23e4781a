//! Strategy runtime (§4.6): a strategy is a [`crate::lifecycle::Subsystem`]
//! plus a market-data/execution subscriber that emits logical *signals*
//! rather than orders directly; a [`SignalHandler`] translates signals to
//! orders under risk and kill-switch checks and submits them via an
//! executor.
//!
//! No example in the pack has a strategy layer; the signal/handler split
//! (rather than letting strategies submit orders directly) follows §9's
//! "no hidden singletons" note generalized one step further — a strategy
//! never needs to know about risk limits or the kill switch, only the
//! handler it hands signals to does.

use crate::bar::BarMatrix;
use crate::decimal::{Price, Quantity};
use crate::events::{BarEvent, OrderEvent, OrderSide, OrderState, OrderStatus, OrderType, TimeInForce, TradeEvent};
use crate::ids::{OrderId, SymbolId};
use crate::lifecycle::Subsystem;

/// A logical trading intent emitted by a [`SignalStrategy`] (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    MarketBuy { symbol: SymbolId, quantity: Quantity },
    MarketSell { symbol: SymbolId, quantity: Quantity },
    LimitBuy { symbol: SymbolId, quantity: Quantity, price: Price },
    LimitSell { symbol: SymbolId, quantity: Quantity, price: Price },
    Cancel { order_id: OrderId },
    CancelAll { symbol: SymbolId },
}

/// A strategy driven by trades and order events, emitting [`Signal`]s
/// rather than submitting orders itself (§4.6).
pub trait SignalStrategy: Subsystem {
    fn on_trade(&mut self, trade: &TradeEvent) -> Vec<Signal>;

    fn on_order_event(&mut self, _event: &OrderEvent) -> Vec<Signal> {
        Vec::new()
    }
}

/// A [`SignalStrategy`] that additionally reads the multi-timeframe bar
/// history (§4.6).
pub trait BarStrategy: SignalStrategy {
    fn on_bar(&mut self, bar: &BarEvent, history: &BarMatrix) -> Vec<Signal>;
}

/// Consulted by a [`SignalHandler`] before translating a signal to an
/// order. Implementations hold whatever position/exposure limits apply.
pub trait RiskCheck {
    fn allow(&self, signal: &Signal) -> bool;
}

/// A kill switch: when tripped, every signal is rejected regardless of
/// what [`RiskCheck`] would otherwise allow.
pub trait KillSwitch {
    fn is_tripped(&self) -> bool;
}

/// The out-of-scope collaborator a [`SignalHandler`] submits translated
/// orders to.
pub trait SignalExecutor {
    fn submit(&self, order: &OrderState);
    fn cancel(&self, order_id: OrderId);
    fn cancel_all(&self, symbol: SymbolId);
}

fn new_order(id: OrderId, side: OrderSide, order_type: OrderType, quantity: Quantity, price: Price, now_ns: i64) -> OrderState {
    OrderState {
        id,
        client_id: id.get(),
        exchange_order_id: None,
        side,
        order_type,
        tif: TimeInForce::Gtc,
        price,
        trigger_price: None,
        quantity,
        filled_quantity: Quantity::ZERO,
        trailing_offset: None,
        visible_quantity: None,
        exec_flags: crate::events::ExecFlags::empty(),
        parent_id: None,
        status: OrderStatus::Submitted,
        created_ts_ns: now_ns,
        last_update_ts_ns: now_ns,
    }
}

/// Translates [`Signal`]s to orders under a [`RiskCheck`] and
/// [`KillSwitch`], then submits them via a [`SignalExecutor`] (§4.6).
/// Every collaborator is an explicit constructor parameter, per §9's
/// "no hidden singletons."
pub struct SignalHandler<'a> {
    risk: &'a dyn RiskCheck,
    kill_switch: &'a dyn KillSwitch,
    executor: &'a dyn SignalExecutor,
    next_order_id: std::sync::atomic::AtomicU64,
}

impl<'a> SignalHandler<'a> {
    pub fn new(risk: &'a dyn RiskCheck, kill_switch: &'a dyn KillSwitch, executor: &'a dyn SignalExecutor) -> Self {
        Self {
            risk,
            kill_switch,
            executor,
            next_order_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Translate and submit `signal`, returning the order id submitted, or
    /// `None` if the kill switch or risk check rejected it (a rejection is
    /// not an error — it is the intended, silent outcome of those checks).
    pub fn handle(&self, signal: Signal, now_ns: i64) -> Option<OrderId> {
        if self.kill_switch.is_tripped() || !self.risk.allow(&signal) {
            return None;
        }

        match signal {
            Signal::Cancel { order_id } => {
                self.executor.cancel(order_id);
                None
            }
            Signal::CancelAll { symbol } => {
                self.executor.cancel_all(symbol);
                None
            }
            Signal::MarketBuy { symbol: _, quantity } => {
                let id = self.mint_order_id();
                let order = new_order(id, OrderSide::Buy, OrderType::Market, quantity, Price::ZERO, now_ns);
                self.executor.submit(&order);
                Some(id)
            }
            Signal::MarketSell { symbol: _, quantity } => {
                let id = self.mint_order_id();
                let order = new_order(id, OrderSide::Sell, OrderType::Market, quantity, Price::ZERO, now_ns);
                self.executor.submit(&order);
                Some(id)
            }
            Signal::LimitBuy { symbol: _, quantity, price } => {
                let id = self.mint_order_id();
                let order = new_order(id, OrderSide::Buy, OrderType::Limit, quantity, price, now_ns);
                self.executor.submit(&order);
                Some(id)
            }
            Signal::LimitSell { symbol: _, quantity, price } => {
                let id = self.mint_order_id();
                let order = new_order(id, OrderSide::Sell, OrderType::Limit, quantity, price, now_ns);
                self.executor.submit(&order);
                Some(id)
            }
        }
    }

    fn mint_order_id(&self) -> OrderId {
        OrderId::new(self.next_order_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct AlwaysAllow;
    impl RiskCheck for AlwaysAllow {
        fn allow(&self, _signal: &Signal) -> bool {
            true
        }
    }

    struct NeverTripped;
    impl KillSwitch for NeverTripped {
        fn is_tripped(&self) -> bool {
            false
        }
    }

    struct AlwaysTripped;
    impl KillSwitch for AlwaysTripped {
        fn is_tripped(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        submitted: Mutex<Vec<OrderState>>,
        canceled: Mutex<Vec<OrderId>>,
    }

    impl SignalExecutor for RecordingExecutor {
        fn submit(&self, order: &OrderState) {
            self.submitted.lock().unwrap().push(*order);
        }
        fn cancel(&self, order_id: OrderId) {
            self.canceled.lock().unwrap().push(order_id);
        }
        fn cancel_all(&self, _symbol: SymbolId) {}
    }

    fn qty(v: f64) -> Quantity {
        Quantity::from_f64(v, Quantity::from_raw(1))
    }

    #[test]
    fn market_buy_signal_submits_a_market_order() {
        let risk = AlwaysAllow;
        let kill = NeverTripped;
        let executor = RecordingExecutor::default();
        let handler = SignalHandler::new(&risk, &kill, &executor);

        let id = handler
            .handle(
                Signal::MarketBuy {
                    symbol: SymbolId::new(0),
                    quantity: qty(1.0),
                },
                0,
            )
            .unwrap();

        let submitted = executor.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].id, id);
        assert_eq!(submitted[0].order_type, OrderType::Market);
        assert_eq!(submitted[0].side, OrderSide::Buy);
    }

    #[test]
    fn tripped_kill_switch_rejects_every_signal() {
        let risk = AlwaysAllow;
        let kill = AlwaysTripped;
        let executor = RecordingExecutor::default();
        let handler = SignalHandler::new(&risk, &kill, &executor);

        let result = handler.handle(
            Signal::MarketBuy {
                symbol: SymbolId::new(0),
                quantity: qty(1.0),
            },
            0,
        );
        assert!(result.is_none());
        assert!(executor.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn cancel_signal_routes_straight_to_the_executor() {
        let risk = AlwaysAllow;
        let kill = NeverTripped;
        let executor = RecordingExecutor::default();
        let handler = SignalHandler::new(&risk, &kill, &executor);

        let result = handler.handle(Signal::Cancel { order_id: OrderId::new(7) }, 0);
        assert!(result.is_none());
        assert_eq!(executor.canceled.lock().unwrap().as_slice(), &[OrderId::new(7)]);
    }

    #[test]
    fn successive_orders_get_distinct_ids() {
        let risk = AlwaysAllow;
        let kill = NeverTripped;
        let executor = RecordingExecutor::default();
        let handler = SignalHandler::new(&risk, &kill, &executor);

        let a = handler
            .handle(
                Signal::MarketBuy {
                    symbol: SymbolId::new(0),
                    quantity: qty(1.0),
                },
                0,
            )
            .unwrap();
        let b = handler
            .handle(
                Signal::MarketBuy {
                    symbol: SymbolId::new(0),
                    quantity: qty(1.0),
                },
                0,
            )
            .unwrap();
        assert_ne!(a, b);
    }
}
