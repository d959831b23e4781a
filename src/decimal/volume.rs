use super::macros::scaled_decimal;

scaled_decimal!(Volume, "A notional (price × quantity) volume, scaled by `SCALE`.");

/// A 128-bit accumulator for summing many [`Volume`] contributions without
/// intermediate rescaling loss, as required for book sweeps (§4.3): only
/// the final division back to a scaled [`Volume`] occurs once, at the end.
#[derive(Debug, Default, Copy, Clone)]
pub struct VolumeAccumulator {
    raw: i128,
}

impl VolumeAccumulator {
    /// A fresh, empty accumulator.
    pub const fn new() -> Self {
        Self { raw: 0 }
    }

    /// Accumulate one more `Volume` contribution.
    #[inline]
    pub fn add(&mut self, value: Volume) {
        self.raw += value.raw() as i128;
    }

    /// Accumulate a raw `price_raw * quantity_raw` product directly (both
    /// already scaled by `SCALE`), deferring the `SCALE` rescale to
    /// [`Self::finish`]. This is the hot path used by
    /// [`crate::book::Book::sweep_asks`] / `sweep_bids`.
    #[inline]
    pub fn add_product(&mut self, price_raw: i64, quantity_raw: i64) {
        self.raw += price_raw as i128 * quantity_raw as i128;
    }

    /// Finalize the accumulation into a single [`Volume`], performing the
    /// one rescale division by `SCALE`.
    #[inline]
    pub fn finish(self) -> Volume {
        Volume::from_raw((self.raw / super::SCALE as i128) as i64)
    }

    /// The raw, not-yet-rescaled 128-bit total.
    #[inline]
    pub const fn raw(self) -> i128 {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Price, Quantity};

    #[test]
    fn accumulator_matches_sum_of_individually_rescaled_volumes() {
        let tick = Price::from_raw(1);
        let mut acc = VolumeAccumulator::new();
        let mut direct_sum = Volume::ZERO;
        for (p, q) in [(100.0, 5.0), (100.5, 3.0), (101.25, 2.0)] {
            let price = Price::from_f64(p, tick);
            let qty = Quantity::from_f64(q, Quantity::from_raw(1));
            acc.add_product(price.raw(), qty.raw());
            direct_sum = direct_sum + price * qty;
        }
        // Difference must be at most a handful of raw units from repeated
        // single-value rescaling, and the accumulator is never worse.
        assert!((acc.finish().raw() - direct_sum.raw()).abs() <= 1);
    }
}
