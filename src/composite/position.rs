//! Aggregated position tracker (§4.5): volume-weighted average entry per
//! `(exchange, symbol)`, summed across exchanges on read.
//!
//! The teacher has no position-keeping code; grounded instead on its
//! `DashMap`-per-key locking idiom (`orderbook/book.rs`'s order maps) —
//! here a `Mutex` per cell stands in for `DashMap`'s internal sharded
//! lock, since folding a fill into a volume-weighted average is an
//! inherently read-modify-write operation that plain atomics cannot
//! express without a compare-and-swap retry loop; a per-cell mutex gives
//! the same single-point-of-contention behaviour as one `DashMap` shard
//! lock, with a simpler, equally fast implementation at this cell count.

use crate::decimal::{Price, Quantity};
use crate::ids::{ExchangeId, SymbolId};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Default)]
struct PositionCell {
    qty_raw: i64,
    avg_entry_raw: i64,
}

/// Per `(exchange, symbol)` position, volume-weighted-average-entry
/// bookkeeping, with a cross-exchange total available on read (§4.5).
pub struct AggregatedPositionTracker {
    max_exchanges: usize,
    cells: Vec<Mutex<PositionCell>>,
}

impl AggregatedPositionTracker {
    pub fn new(max_symbols: usize, max_exchanges: usize) -> Self {
        let total = max_symbols * max_exchanges;
        Self {
            max_exchanges,
            cells: (0..total).map(|_| Mutex::new(PositionCell::default())).collect(),
        }
    }

    fn index(&self, symbol: SymbolId, exchange: ExchangeId) -> usize {
        symbol.index() * self.max_exchanges + exchange.index()
    }

    /// Fold a fill into `(exchange, symbol)`'s position. `signed_qty` is
    /// positive for a buy fill, negative for a sell fill. Reducing or
    /// flat-crossing fills leave `avg_entry` unchanged when the position
    /// fully flattens, and reseed it to `price` when the position flips
    /// sign.
    pub fn on_fill(&self, exchange: ExchangeId, symbol: SymbolId, signed_qty: Quantity, price: Price) {
        let mut cell = self.cells[self.index(symbol, exchange)].lock().expect("poisoned");
        let signed_raw = signed_qty.raw();
        let new_qty_raw = cell.qty_raw + signed_raw;

        let same_direction_add = cell.qty_raw == 0
            || (cell.qty_raw > 0 && signed_raw > 0)
            || (cell.qty_raw < 0 && signed_raw < 0);

        if same_direction_add {
            let prior_notional = cell.qty_raw as i128 * cell.avg_entry_raw as i128;
            let fill_notional = signed_raw as i128 * price.raw() as i128;
            cell.avg_entry_raw = if new_qty_raw != 0 {
                ((prior_notional + fill_notional) / new_qty_raw as i128) as i64
            } else {
                0
            };
        } else if new_qty_raw == 0 {
            cell.avg_entry_raw = 0;
        } else if (new_qty_raw > 0) != (cell.qty_raw > 0) {
            // The fill reduced the position through zero and flipped
            // its sign: the remainder is a brand-new position opened at
            // this fill's price.
            cell.avg_entry_raw = price.raw();
        }
        // Else: a partial reduction that doesn't flip sign keeps the
        // existing average entry.

        cell.qty_raw = new_qty_raw;
    }

    /// The current `(qty, avg_entry)` for one `(exchange, symbol)` cell.
    pub fn position(&self, exchange: ExchangeId, symbol: SymbolId) -> (Quantity, Price) {
        let cell = self.cells[self.index(symbol, exchange)].lock().expect("poisoned");
        (Quantity::from_raw(cell.qty_raw), Price::from_raw(cell.avg_entry_raw))
    }

    /// Total signed quantity for `symbol` summed across every exchange.
    pub fn total_quantity(&self, symbol: SymbolId) -> Quantity {
        let mut total = 0i64;
        for exchange_idx in 0..self.max_exchanges {
            let cell = self.cells[self.index(symbol, ExchangeId::new(exchange_idx as u8))]
                .lock()
                .expect("poisoned");
            total += cell.qty_raw;
        }
        Quantity::from_raw(total)
    }
}
