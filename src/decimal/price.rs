use super::macros::scaled_decimal;
use super::quantity::Quantity;
use super::volume::Volume;

scaled_decimal!(Price, "A traded or quoted price, scaled by `SCALE`.");

impl std::ops::Mul<Quantity> for Price {
    type Output = Volume;

    /// `Price * Quantity -> Volume`, rescaling the `SCALE^2` product back to
    /// a single `SCALE` factor.
    #[inline]
    fn mul(self, rhs: Quantity) -> Volume {
        let product = self.raw() as i128 * rhs.raw() as i128;
        Volume::from_raw((product / super::SCALE as i128) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f64_rounds_to_tick() {
        let tick = Price::from_raw(1_000_000); // 0.01 scaled by 1e8
        let p = Price::from_f64(100.005, tick);
        // 100.005 / 0.01 = 10000.5 -> banker's rounding to even -> 10000
        assert_eq!(p.raw(), 10_000 * 1_000_000);
    }

    #[test]
    fn round_trip_within_half_tick() {
        let tick = Price::from_raw(1_000_000);
        for raw_x in [10_000_123_i64, 99_999_999, 1] {
            let x = raw_x as f64 / super::super::SCALE as f64;
            let rounded = Price::from_f64(x, tick).to_f64();
            assert!((rounded - x).abs() <= tick.to_f64() / 2.0 + 1e-12);
        }
    }

    #[test]
    fn multiply_produces_volume() {
        let price = Price::from_f64(100.0, Price::from_raw(1));
        let qty = Quantity::from_f64(3.0, Quantity::from_raw(1));
        let vol = price * qty;
        assert!((vol.to_f64() - 300.0).abs() < 1e-6);
    }
}
