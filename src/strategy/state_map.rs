//! Per-symbol scratch state for strategies (§4.6): a densely indexed array
//! up to `N`, with an overflow `HashMap` for symbols beyond that ceiling —
//! the same dense-plus-overflow shape as [`crate::bar::BarAggregator`],
//! reused here since both are "one small piece of state per `SymbolId`"
//! problems.

use crate::ids::SymbolId;
use std::collections::HashMap;

/// Densely indexed per-symbol scratch state, up to `N` symbols held inline;
/// symbols beyond `N` fall back to a `HashMap` (§4.6, §9's "symbol dense
/// maps" design note — the movable/non-movable type-level gate is not
/// reproduced here; see DESIGN.md).
pub struct SymbolStateMap<T, const N: usize> {
    dense: Vec<Option<T>>,
    overflow: HashMap<SymbolId, T>,
}

impl<T, const N: usize> SymbolStateMap<T, N> {
    pub fn new() -> Self {
        let mut dense = Vec::with_capacity(N);
        dense.resize_with(N, || None);
        Self {
            dense,
            overflow: HashMap::new(),
        }
    }

    /// Borrow the state for `symbol`, if any has been set.
    pub fn get(&self, symbol: SymbolId) -> Option<&T> {
        let idx = symbol.index();
        if idx < N {
            self.dense[idx].as_ref()
        } else {
            self.overflow.get(&symbol)
        }
    }

    /// Mutably borrow the state for `symbol`, if any has been set.
    pub fn get_mut(&mut self, symbol: SymbolId) -> Option<&mut T> {
        let idx = symbol.index();
        if idx < N {
            self.dense[idx].as_mut()
        } else {
            self.overflow.get_mut(&symbol)
        }
    }

    /// Get the existing state for `symbol`, or insert `default()`'s result
    /// and return a mutable borrow of it.
    pub fn get_or_insert_with(&mut self, symbol: SymbolId, default: impl FnOnce() -> T) -> &mut T {
        let idx = symbol.index();
        if idx < N {
            self.dense[idx].get_or_insert_with(default)
        } else {
            self.overflow.entry(symbol).or_insert_with(default)
        }
    }

    /// Replace (or set for the first time) the state for `symbol`,
    /// returning whatever was there before.
    pub fn insert(&mut self, symbol: SymbolId, value: T) -> Option<T> {
        let idx = symbol.index();
        if idx < N {
            self.dense[idx].replace(value)
        } else {
            self.overflow.insert(symbol, value)
        }
    }

    /// Remove and return the state for `symbol`, if any.
    pub fn remove(&mut self, symbol: SymbolId) -> Option<T> {
        let idx = symbol.index();
        if idx < N {
            self.dense[idx].take()
        } else {
            self.overflow.remove(&symbol)
        }
    }
}

impl<T, const N: usize> Default for SymbolStateMap<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_slot_round_trips() {
        let mut map: SymbolStateMap<i32, 4> = SymbolStateMap::new();
        assert!(map.get(SymbolId::new(1)).is_none());
        map.insert(SymbolId::new(1), 42);
        assert_eq!(*map.get(SymbolId::new(1)).unwrap(), 42);
    }

    #[test]
    fn overflow_slot_round_trips_beyond_dense_ceiling() {
        let mut map: SymbolStateMap<i32, 2> = SymbolStateMap::new();
        map.insert(SymbolId::new(5), 99);
        assert_eq!(*map.get(SymbolId::new(5)).unwrap(), 99);
        assert_eq!(map.remove(SymbolId::new(5)), Some(99));
        assert!(map.get(SymbolId::new(5)).is_none());
    }

    #[test]
    fn get_or_insert_with_only_calls_default_once() {
        let mut map: SymbolStateMap<Vec<i32>, 4> = SymbolStateMap::new();
        map.get_or_insert_with(SymbolId::new(0), Vec::new).push(1);
        map.get_or_insert_with(SymbolId::new(0), || panic!("should not run twice")).push(2);
        assert_eq!(map.get(SymbolId::new(0)).unwrap(), &vec![1, 2]);
    }
}
