//! Fixed-point scaled-integer numeric types: [`Price`], [`Quantity`], [`Volume`].
//!
//! Every value is a 64-bit signed integer scaled by [`SCALE`] (10^8). The
//! three types are distinct at the type level: `Price + Quantity` does not
//! type-check, but `Price * Quantity -> Volume` (and the commuted form) is
//! provided with result rescaling. Division by an integer divisor keeps the
//! tag; division by a same-tagged value yields a dimensionless `f64` ratio.
//!
//! Construction from a floating-point value rounds to the nearest tick using
//! banker's rounding (round-half-to-even), matching the testable property
//! that `from_f64(x, tick).to_f64()` lands within `tick / 2` of `x`.

mod macros;
mod price;
mod quantity;
mod volume;

pub use price::Price;
pub use quantity::Quantity;
pub use volume::{Volume, VolumeAccumulator};

/// Scale factor applied to every fixed-point value (10^8).
pub const SCALE: i64 = 100_000_000;

/// Round `raw / divisor` to the nearest integer, ties to even (banker's
/// rounding). `divisor` must be positive.
#[inline]
pub(crate) fn round_half_even_div(raw: i128, divisor: i128) -> i128 {
    debug_assert!(divisor > 0);
    let quotient = raw.div_euclid(divisor);
    let remainder = raw.rem_euclid(divisor);
    let twice = remainder * 2;
    match twice.cmp(&divisor) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

/// Round `x` (a real number, already scaled by [`SCALE`] as an `f64`) to the
/// nearest multiple of `tick_raw` (also scaled by [`SCALE`]), ties to even.
#[inline]
fn round_to_tick_raw(scaled: f64, tick_raw: i64) -> i64 {
    if tick_raw <= 0 {
        return scaled.round() as i64;
    }
    let ticks = scaled / tick_raw as f64;
    let floor = ticks.floor();
    let frac = ticks - floor;
    let floor_i = floor as i64;
    let rounded = if frac < 0.5 {
        floor_i
    } else if frac > 0.5 {
        floor_i + 1
    } else if floor_i % 2 == 0 {
        floor_i
    } else {
        floor_i + 1
    };
    rounded.saturating_mul(tick_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_even_rounds_to_even_neighbour() {
        assert_eq!(round_half_even_div(5, 2), 2); // 2.5 -> 2
        assert_eq!(round_half_even_div(7, 2), 4); // 3.5 -> 4
        assert_eq!(round_half_even_div(-5, 2), -2);
    }
}
