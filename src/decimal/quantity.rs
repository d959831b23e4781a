use super::macros::scaled_decimal;
use super::price::Price;
use super::volume::Volume;

scaled_decimal!(Quantity, "An order or fill quantity, scaled by `SCALE`.");

impl std::ops::Mul<Price> for Quantity {
    type Output = Volume;

    /// `Quantity * Price -> Volume`, the commuted form of `Price * Quantity`.
    #[inline]
    fn mul(self, rhs: Price) -> Volume {
        rhs * self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commuted_multiply_matches() {
        let price = Price::from_f64(50.25, Price::from_raw(1));
        let qty = Quantity::from_f64(4.0, Quantity::from_raw(1));
        assert_eq!((price * qty).raw(), (qty * price).raw());
    }
}
