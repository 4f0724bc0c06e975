//! Usage reconciliation arithmetic.
//!
//! All money and minute arithmetic is exact decimal. Minutes carry 3
//! decimal places, costs 2. Only the portion of a call beyond the
//! plan's included minutes is priced; a call that crosses the quota
//! boundary is split.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Calls shorter than this are treated as hangups and not recorded.
pub const MIN_BILLABLE_SECONDS: i32 = 3;

pub fn is_billable_duration(duration_seconds: i32) -> bool {
    duration_seconds >= MIN_BILLABLE_SECONDS
}

/// One call's usage, priced against the subscription's quota state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageComputation {
    /// Call length in minutes, 3 dp.
    pub quantity_minutes: Decimal,
    /// The part of this call beyond the included minutes, 3 dp.
    pub overage_minutes: Decimal,
    /// Zero unless the call produced overage.
    pub unit_price: Decimal,
    /// overage * unit price, 2 dp.
    pub total_cost: Decimal,
}

/// Price one completed call given the minutes already recorded in the
/// current billing period.
pub fn compute_usage(
    duration_seconds: i32,
    minutes_used: Decimal,
    minutes_included: i32,
    overage_price: Decimal,
) -> UsageComputation {
    let quantity_minutes = (Decimal::from(duration_seconds) / Decimal::from(60)).round_dp(3);

    let minutes_before = minutes_used;
    let minutes_after = minutes_before + quantity_minutes;
    let included = Decimal::from(minutes_included);

    let overage_minutes = if minutes_after > included {
        if minutes_before >= included {
            // Already over quota, the entire call is overage.
            quantity_minutes
        } else {
            // This call crosses the threshold.
            minutes_after - included
        }
    } else {
        Decimal::ZERO
    }
    .round_dp(3);

    let has_overage = overage_minutes > Decimal::ZERO;
    let unit_price = if has_overage {
        overage_price
    } else {
        Decimal::ZERO
    };
    let total_cost = (overage_minutes * overage_price).round_dp(2);

    UsageComputation {
        quantity_minutes,
        overage_minutes,
        unit_price,
        total_cost,
    }
}

/// Whole overage minutes to report to the payment provider's metered
/// billing, rounded up.
pub fn billable_overage_units(overage_minutes: Decimal) -> u64 {
    overage_minutes.ceil().to_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PRICE: Decimal = dec!(0.15);

    #[test]
    fn call_under_quota_costs_nothing() {
        let usage = compute_usage(120, dec!(50), 100, PRICE);
        assert_eq!(usage.quantity_minutes, dec!(2));
        assert_eq!(usage.overage_minutes, Decimal::ZERO);
        assert_eq!(usage.unit_price, Decimal::ZERO);
        assert_eq!(usage.total_cost, Decimal::ZERO);
    }

    #[test]
    fn call_crossing_quota_is_split() {
        // 99 minutes used, 100 included, 2-minute call: 1 minute over.
        let usage = compute_usage(120, dec!(99), 100, PRICE);
        assert_eq!(usage.quantity_minutes, dec!(2));
        assert_eq!(usage.overage_minutes, dec!(1));
        assert_eq!(usage.unit_price, PRICE);
        assert_eq!(usage.total_cost, dec!(0.15));
    }

    #[test]
    fn call_fully_over_quota_is_all_overage() {
        let usage = compute_usage(187, dec!(150), 100, PRICE);
        assert_eq!(usage.quantity_minutes, dec!(3.117));
        assert_eq!(usage.overage_minutes, dec!(3.117));
        // 3.117 * 0.15 = 0.46755, rounded to cents.
        assert_eq!(usage.total_cost, dec!(0.47));
    }

    #[test]
    fn exact_quota_boundary_produces_no_overage() {
        let usage = compute_usage(60, dec!(99), 100, PRICE);
        assert_eq!(usage.overage_minutes, Decimal::ZERO);
        assert_eq!(usage.total_cost, Decimal::ZERO);
    }

    #[test]
    fn minutes_are_rounded_to_three_decimals() {
        let usage = compute_usage(62, dec!(0), 100, PRICE);
        // 62 / 60 = 1.0333...
        assert_eq!(usage.quantity_minutes, dec!(1.033));
    }

    #[test]
    fn short_calls_are_not_billable() {
        assert!(!is_billable_duration(0));
        assert!(!is_billable_duration(2));
        assert!(is_billable_duration(3));
        assert!(is_billable_duration(187));
    }

    #[test]
    fn reported_units_round_up() {
        assert_eq!(billable_overage_units(dec!(0.001)), 1);
        assert_eq!(billable_overage_units(dec!(3.117)), 4);
        assert_eq!(billable_overage_units(dec!(2)), 2);
        assert_eq!(billable_overage_units(Decimal::ZERO), 0);
    }
}
