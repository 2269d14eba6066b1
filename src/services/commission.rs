//! Commission calculation
//!
//! Pure math over the lead's snapshotted rate; storage never reaches in here.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ApiError, ApiResult};

/// Commission owed to the referrer: `job_value * rate / 100`, rounded
/// half-away-from-zero to cents. `rate` is a percentage, e.g. 10 means 10%.
pub fn calculate_commission(job_value: Decimal, rate: Decimal) -> ApiResult<Decimal> {
    if job_value < Decimal::ZERO {
        return Err(ApiError::invalid_argument("Job value must not be negative"));
    }
    if rate < Decimal::ZERO || rate > Decimal::from(100) {
        return Err(ApiError::invalid_argument(
            "Commission rate must be between 0 and 100",
        ));
    }

    let amount = job_value * rate / Decimal::from(100);
    Ok(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn ten_percent_of_4500_is_450() {
        let amount = calculate_commission(dec("4500"), dec("10")).unwrap();
        assert_eq!(amount, dec("450.00"));
    }

    #[test]
    fn result_is_rounded_to_cents() {
        // 333.33 * 7.5% = 24.99975 -> 25.00
        let amount = calculate_commission(dec("333.33"), dec("7.5")).unwrap();
        assert_eq!(amount, dec("25.00"));

        // Midpoint rounds away from zero: 100.50 * 10% = 10.05, 100.25 * 10% = 10.025 -> 10.03
        let amount = calculate_commission(dec("100.25"), dec("10")).unwrap();
        assert_eq!(amount, dec("10.03"));
    }

    #[test]
    fn zero_rate_and_zero_value_are_valid() {
        assert_eq!(
            calculate_commission(dec("4500"), Decimal::ZERO).unwrap(),
            dec("0.00")
        );
        assert_eq!(
            calculate_commission(Decimal::ZERO, dec("10")).unwrap(),
            dec("0.00")
        );
    }

    #[test]
    fn negative_job_value_is_rejected() {
        let err = calculate_commission(dec("-1"), dec("10")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        assert!(matches!(
            calculate_commission(dec("100"), dec("-0.01")),
            Err(ApiError::InvalidArgument(_))
        ));
        assert!(matches!(
            calculate_commission(dec("100"), dec("100.01")),
            Err(ApiError::InvalidArgument(_))
        ));
    }
}
