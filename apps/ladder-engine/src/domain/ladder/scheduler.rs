//! Level price schedule.
//!
//! `price(i) = round(entry × (1 − drawdown × i), 2)` for `i` in `1..=count`,
//! rounded half away from zero. Prices strictly decrease with `i` whenever
//! the step `entry × drawdown` is at least one cent.

use rust_decimal::{Decimal, RoundingStrategy};

use super::errors::LadderError;

/// Decimal places of a limit price.
pub const PRICE_SCALE: u32 = 2;

/// Compute the target price of every level.
///
/// Pure and deterministic. Negative prices are returned as computed; callers
/// decide whether a level is submittable.
///
/// # Errors
///
/// Returns `LadderError::InvalidParameter` if `entry_price ≤ 0`,
/// `drawdown_fraction ∉ (0, 1)`, `count < 1`, or the arithmetic overflows.
pub fn compute_levels(
    entry_price: Decimal,
    drawdown_fraction: Decimal,
    count: u32,
) -> Result<Vec<(u32, Decimal)>, LadderError> {
    if entry_price <= Decimal::ZERO {
        return Err(LadderError::invalid_parameter(
            "entry_price",
            format!("must be positive, got {entry_price}"),
        ));
    }
    if drawdown_fraction <= Decimal::ZERO || drawdown_fraction >= Decimal::ONE {
        return Err(LadderError::invalid_parameter(
            "drawdown_fraction",
            format!("must be in (0, 1), got {drawdown_fraction}"),
        ));
    }
    if count == 0 {
        return Err(LadderError::invalid_parameter(
            "count",
            "must be at least 1",
        ));
    }

    (1..=count)
        .map(|index| {
            let factor = Decimal::ONE - drawdown_fraction * Decimal::from(index);
            let price = entry_price.checked_mul(factor).ok_or_else(|| {
                LadderError::invalid_parameter("entry_price", "level price overflows")
            })?;
            Ok((index, round_price(price)))
        })
        .collect()
}

/// Round a price to cents, half away from zero.
#[must_use]
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether a ladder of `count` levels stays above a zero price.
#[must_use]
pub fn ladder_stays_positive(drawdown_fraction: Decimal, count: u32) -> bool {
    drawdown_fraction
        .checked_mul(Decimal::from(count))
        .is_some_and(|depth| depth < Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn five_percent_three_levels() {
        let levels = compute_levels(dec!(100), dec!(0.05), 3).unwrap();
        assert_eq!(
            levels,
            vec![(1, dec!(95.00)), (2, dec!(90.00)), (3, dec!(85.00))]
        );
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 10.05 * 0.95 = 9.5475 -> 9.55
        let levels = compute_levels(dec!(10.05), dec!(0.05), 1).unwrap();
        assert_eq!(levels, vec![(1, dec!(9.55))]);
        assert_eq!(round_price(dec!(-0.005)), dec!(-0.01));
    }

    #[test]
    fn deep_ladders_go_negative() {
        let levels = compute_levels(dec!(100), dec!(0.5), 3).unwrap();
        assert_eq!(levels[2], (3, dec!(-50.00)));
    }

    #[test]
    fn rejects_non_positive_entry() {
        let err = compute_levels(Decimal::ZERO, dec!(0.05), 3).unwrap_err();
        assert!(matches!(err, LadderError::InvalidParameter { ref parameter, .. } if parameter == "entry_price"));
    }

    #[test]
    fn rejects_fraction_outside_unit_interval() {
        assert!(compute_levels(dec!(100), Decimal::ZERO, 3).is_err());
        assert!(compute_levels(dec!(100), Decimal::ONE, 3).is_err());
    }

    #[test]
    fn rejects_zero_count() {
        assert!(compute_levels(dec!(100), dec!(0.05), 0).is_err());
    }

    #[test]
    fn ladder_depth_check() {
        assert!(ladder_stays_positive(dec!(0.05), 19));
        assert!(!ladder_stays_positive(dec!(0.05), 20));
        assert!(!ladder_stays_positive(dec!(0.25), 5));
    }

    proptest! {
        #[test]
        fn schedule_matches_formula_and_decreases(
            entry_cents in 100i64..10_000_000,
            drawdown_bp in 1i64..100,
            count in 1u32..60,
        ) {
            let entry = Decimal::new(entry_cents, 2);
            let drawdown = Decimal::new(drawdown_bp, 2);

            let levels = compute_levels(entry, drawdown, count).unwrap();

            prop_assert_eq!(levels.len(), count as usize);
            for (position, (index, price)) in levels.iter().enumerate() {
                prop_assert_eq!(*index, position as u32 + 1);
                let expected = round_price(entry * (Decimal::ONE - drawdown * Decimal::from(*index)));
                prop_assert_eq!(*price, expected);
            }
            for pair in levels.windows(2) {
                prop_assert!(pair[0].1 > pair[1].1);
            }
        }
    }
}
