//! Money arithmetic
//!
//! Entity rows store monetary amounts as `f64` for serialization parity with
//! the wire format; every computation routes through `rust_decimal` and is
//! rounded back to two decimal places, so repeated recalculation never drifts.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Lift an `f64` amount into `Decimal`. Non-finite input maps to zero; the
/// validators below reject such rows before arithmetic ever sees them.
fn d(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Round to two decimal places, banker's rounding.
pub fn round2(value: f64) -> f64 {
    d(value).round_dp(2).to_f64().unwrap_or(0.0)
}

/// `qty * price` with decimal precision.
pub fn line_cost(qty: f64, price: f64) -> f64 {
    (d(qty) * d(price)).round_dp(2).to_f64().unwrap_or(0.0)
}

/// Sum a list of amounts with decimal precision.
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values
        .into_iter()
        .map(d)
        .sum::<Decimal>()
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

/// `a - b` with decimal precision. Used for refund deltas, so the result may
/// be negative.
pub fn diff(a: f64, b: f64) -> f64 {
    (d(a) - d(b)).round_dp(2).to_f64().unwrap_or(0.0)
}

/// Reject NaN and infinities.
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite()
}

/// Reject NaN, infinities and negative amounts.
pub fn is_valid_price(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_cost_has_no_float_drift() {
        // 0.1 * 3 is the classic binary-float trap
        assert_eq!(line_cost(3.0, 0.1), 0.3);
        assert_eq!(line_cost(2.0, 59.99), 119.98);
    }

    #[test]
    fn sum_rounds_to_cents() {
        assert_eq!(sum([0.1, 0.2]), 0.3);
        assert_eq!(sum([10.555, 0.0]), 10.56);
    }

    #[test]
    fn diff_may_go_negative() {
        assert_eq!(diff(200.0, 300.0), -100.0);
    }

    #[test]
    fn validators_reject_non_finite() {
        assert!(!is_valid_amount(f64::NAN));
        assert!(!is_valid_amount(f64::INFINITY));
        assert!(is_valid_amount(-5.0));
        assert!(!is_valid_price(-5.0));
        assert!(is_valid_price(0.0));
    }
}
