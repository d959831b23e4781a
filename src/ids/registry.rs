//! Symbol/exchange registry (§4.7): issues stable dense IDs for
//! `(exchange_name, symbol_string)` pairs and for exchange names, and
//! optionally groups `SymbolId`s that denote economically equivalent
//! instruments across venues.
//!
//! Grounded in the teacher's `DashMap`-based concurrent lookup maps
//! (`OrderBook::order_locations`, `OrderBook::user_orders` in
//! `orderbook/book.rs`): registration uses the same `entry().or_insert_with`
//! idiom to make "first caller wins" assignment atomic without a global
//! lock, and lookups after registration are plain `DashMap::get` calls.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use super::{ExchangeId, SymbolId};

/// An identifier for a group of economically equivalent `SymbolId`s across
/// venues (e.g. the same underlying future listed on two exchanges).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EquivalenceClassId(u64);

/// Errors raised by [`Registry`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A dense ID space (`SymbolId: u32` or `ExchangeId: u8`) has been
    /// exhausted.
    #[error("registry capacity exhausted for {what}")]
    Capacity {
        /// Which ID space overflowed.
        what: &'static str,
    },
    /// A lookup was made for an identifier the registry never issued.
    #[error("unknown identifier")]
    Unknown,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct SymbolKey {
    exchange: ExchangeId,
    symbol: String,
}

/// Stable-ID registry for symbols and exchanges (§4.7).
///
/// Registration (`register_exchange`/`register_symbol`) is thread-safe via
/// `DashMap`'s internal sharded locking. Lookups (`symbol_id`/`exchange_id`/
/// `symbol_name`/`exchange_name`) are lock-free reads once the initial
/// registration phase has quiesced, matching the contract in §4.7.
#[derive(Debug, Default)]
pub struct Registry {
    exchange_by_name: DashMap<String, ExchangeId>,
    exchange_name_by_id: DashMap<ExchangeId, String>,
    next_exchange_id: AtomicU16,

    symbol_by_key: DashMap<SymbolKey, SymbolId>,
    symbol_key_by_id: DashMap<SymbolId, SymbolKey>,
    next_symbol_id: AtomicU32,

    equivalence_of: DashMap<SymbolId, EquivalenceClassId>,
    equivalence_members: Mutex<std::collections::HashMap<EquivalenceClassId, Vec<SymbolId>>>,
    next_class_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign a stable [`ExchangeId`] for `name`.
    pub fn register_exchange(&self, name: &str) -> Result<ExchangeId, RegistryError> {
        if let Some(existing) = self.exchange_by_name.get(name) {
            return Ok(*existing);
        }
        match self.exchange_by_name.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Ok(*occupied.get()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let raw = self.next_exchange_id.fetch_add(1, Ordering::Relaxed);
                if raw > u8::MAX as u16 {
                    return Err(RegistryError::Capacity {
                        what: "ExchangeId",
                    });
                }
                let id = ExchangeId::new(raw as u8);
                vacant.insert(id);
                self.exchange_name_by_id.insert(id, name.to_string());
                tracing::debug!(exchange = name, id = raw, "registered exchange");
                Ok(id)
            }
        }
    }

    /// Get or assign a stable [`SymbolId`] for `(exchange, symbol)`.
    pub fn register_symbol(
        &self,
        exchange: ExchangeId,
        symbol: &str,
    ) -> Result<SymbolId, RegistryError> {
        let key = SymbolKey {
            exchange,
            symbol: symbol.to_string(),
        };
        if let Some(existing) = self.symbol_by_key.get(&key) {
            return Ok(*existing);
        }
        match self.symbol_by_key.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Ok(*occupied.get()),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let raw = self.next_symbol_id.fetch_add(1, Ordering::Relaxed);
                if raw == u32::MAX {
                    return Err(RegistryError::Capacity { what: "SymbolId" });
                }
                let id = SymbolId::new(raw);
                vacant.insert(id);
                self.symbol_key_by_id.insert(id, key);
                tracing::debug!(exchange = %exchange, symbol, id = raw, "registered symbol");
                Ok(id)
            }
        }
    }

    /// Look up the `SymbolId` previously assigned to `(exchange, symbol)`.
    pub fn symbol_id(&self, exchange: ExchangeId, symbol: &str) -> Option<SymbolId> {
        self.symbol_by_key
            .get(&SymbolKey {
                exchange,
                symbol: symbol.to_string(),
            })
            .map(|e| *e)
    }

    /// Look up the exchange name and symbol string a `SymbolId` denotes.
    pub fn symbol_name(&self, id: SymbolId) -> Option<(ExchangeId, String)> {
        self.symbol_key_by_id
            .get(&id)
            .map(|e| (e.exchange, e.symbol.clone()))
    }

    /// Look up the `ExchangeId` previously assigned to `name`.
    pub fn exchange_id(&self, name: &str) -> Option<ExchangeId> {
        self.exchange_by_name.get(name).map(|e| *e)
    }

    /// Look up the exchange name a `ExchangeId` denotes.
    pub fn exchange_name(&self, id: ExchangeId) -> Option<String> {
        self.exchange_name_by_id.get(&id).map(|e| e.clone())
    }

    /// Declare that `a` and `b` denote economically equivalent instruments,
    /// merging their equivalence classes (creating one if neither symbol
    /// has been classified yet).
    pub fn link_equivalent(&self, a: SymbolId, b: SymbolId) {
        if a == b {
            return;
        }
        let mut members = self.equivalence_members.lock().expect("poisoned");
        let class_a = self.equivalence_of.get(&a).map(|e| *e);
        let class_b = self.equivalence_of.get(&b).map(|e| *e);
        let target = match (class_a, class_b) {
            (Some(ca), Some(cb)) if ca == cb => ca,
            (Some(ca), Some(cb)) => {
                let absorbed = members.remove(&cb).unwrap_or_default();
                let entry = members.entry(ca).or_default();
                entry.extend(absorbed);
                for m in entry.clone() {
                    self.equivalence_of.insert(m, ca);
                }
                ca
            }
            (Some(ca), None) => ca,
            (None, Some(cb)) => cb,
            (None, None) => {
                let raw = self.next_class_id.fetch_add(1, Ordering::Relaxed);
                EquivalenceClassId(raw)
            }
        };
        self.equivalence_of.insert(a, target);
        self.equivalence_of.insert(b, target);
        let entry = members.entry(target).or_default();
        if !entry.contains(&a) {
            entry.push(a);
        }
        if !entry.contains(&b) {
            entry.push(b);
        }
    }

    /// All symbols economically equivalent to `symbol`, including itself,
    /// or just `[symbol]` if it has no declared equivalents.
    pub fn equivalence_class(&self, symbol: SymbolId) -> Vec<SymbolId> {
        match self.equivalence_of.get(&symbol) {
            Some(class) => {
                let members = self.equivalence_members.lock().expect("poisoned");
                members.get(&*class).cloned().unwrap_or_else(|| vec![symbol])
            }
            None => vec![symbol],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_registration_is_stable() {
        let reg = Registry::new();
        let ex = reg.register_exchange("binance").unwrap();
        let s1 = reg.register_symbol(ex, "BTC-USD").unwrap();
        let s2 = reg.register_symbol(ex, "BTC-USD").unwrap();
        assert_eq!(s1, s2);
        assert_eq!(reg.symbol_id(ex, "BTC-USD"), Some(s1));
    }

    #[test]
    fn distinct_symbols_get_dense_ids() {
        let reg = Registry::new();
        let ex = reg.register_exchange("binance").unwrap();
        let a = reg.register_symbol(ex, "BTC-USD").unwrap();
        let b = reg.register_symbol(ex, "ETH-USD").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.get(), 0);
        assert_eq!(b.get(), 1);
    }

    #[test]
    fn equivalence_classes_merge() {
        let reg = Registry::new();
        let binance = reg.register_exchange("binance").unwrap();
        let coinbase = reg.register_exchange("coinbase").unwrap();
        let a = reg.register_symbol(binance, "BTC-USD").unwrap();
        let b = reg.register_symbol(coinbase, "BTC-USD").unwrap();
        let c = reg.register_symbol(coinbase, "BTC-USDT").unwrap();
        reg.link_equivalent(a, b);
        reg.link_equivalent(b, c);
        let class = reg.equivalence_class(a);
        assert_eq!(class.len(), 3);
        assert!(class.contains(&a) && class.contains(&b) && class.contains(&c));
    }
}
