//! Profit estimation from configured cost-ratio parameters
//!
//! Applies a store's configured food/labor/utility ratios and fixed cost to
//! an actual monthly COGS figure to derive an estimated profit. All
//! intermediate arithmetic stays in `Decimal`; every monetary output is
//! rounded to whole yen in a single final round-half-up step.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A profit-estimate parameter set, store-specific or global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitSetting {
    /// `None` means a global setting applying to every store.
    pub store_id: Option<i64>,
    pub effective_from: NaiveDate,
    /// Combined food + labor cost ratio.
    pub fl_ratio: Decimal,
    /// Food cost ratio.
    pub food_ratio: Decimal,
    /// Utility cost ratio.
    pub utility_ratio: Decimal,
    /// Monthly fixed cost in whole yen.
    pub fixed_cost_yen: i64,
}

/// Derived profit estimate for a single month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitEstimate {
    pub fl_ratio: Decimal,
    pub food_ratio: Decimal,
    /// `fl_ratio - food_ratio`.
    pub labor_ratio: Decimal,
    pub utility_ratio: Decimal,
    pub fixed_cost_yen: i64,
    /// Which setting produced this estimate (`None` = global).
    pub setting_store_id: Option<i64>,
    pub cogs_yen: i64,
    pub ideal_sales_yen: i64,
    pub ideal_labor_yen: i64,
    pub utility_yen: i64,
    pub contrib_yen: i64,
    pub est_profit_yen: i64,
}

/// Round a decimal amount to whole yen, half-up.
fn yen(v: Decimal) -> Option<i64> {
    v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Estimate profit for one month from its COGS and a parameter set.
///
/// Returns `None` when no meaningful estimate exists: a zero food ratio
/// (the ideal-sales division is undefined) or a zero COGS month. A missing
/// setting is handled by the caller never reaching this function.
pub fn estimate(cogs_yen: i64, setting: &ProfitSetting) -> Option<ProfitEstimate> {
    if setting.food_ratio.is_zero() || cogs_yen == 0 {
        return None;
    }

    let labor_ratio = setting.fl_ratio - setting.food_ratio;
    let cogs = Decimal::from(cogs_yen);

    let ideal_sales = cogs / setting.food_ratio;
    let ideal_labor = ideal_sales * labor_ratio;
    let utility = ideal_sales * setting.utility_ratio;
    let contrib = ideal_sales - cogs - ideal_labor - utility;
    let est_profit = contrib - Decimal::from(setting.fixed_cost_yen);

    Some(ProfitEstimate {
        fl_ratio: setting.fl_ratio,
        food_ratio: setting.food_ratio,
        labor_ratio,
        utility_ratio: setting.utility_ratio,
        fixed_cost_yen: setting.fixed_cost_yen,
        setting_store_id: setting.store_id,
        cogs_yen,
        ideal_sales_yen: yen(ideal_sales)?,
        ideal_labor_yen: yen(ideal_labor)?,
        utility_yen: yen(utility)?,
        contrib_yen: yen(contrib)?,
        est_profit_yen: yen(est_profit)?,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn setting() -> ProfitSetting {
        ProfitSetting {
            store_id: Some(1),
            effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            fl_ratio: dec("0.55"),
            food_ratio: dec("0.30"),
            utility_ratio: dec("0.08"),
            fixed_cost_yen: 500_000,
        }
    }

    #[test]
    fn estimate_matches_hand_computation() {
        // cogs 300_000 at food ratio 0.30 -> ideal sales 1_000_000.
        let est = estimate(300_000, &setting()).unwrap();
        assert_eq!(est.ideal_sales_yen, 1_000_000);
        assert_eq!(est.labor_ratio, dec("0.25"));
        assert_eq!(est.ideal_labor_yen, 250_000);
        assert_eq!(est.utility_yen, 80_000);
        assert_eq!(est.contrib_yen, 1_000_000 - 300_000 - 250_000 - 80_000);
        assert_eq!(est.est_profit_yen, est.contrib_yen - 500_000);
    }

    #[test]
    fn estimate_can_be_negative() {
        let est = estimate(30_000, &setting()).unwrap();
        assert!(est.est_profit_yen < 0);
    }

    #[test]
    fn rounding_is_half_up_and_applied_once() {
        let mut s = setting();
        s.food_ratio = dec("0.3");
        s.fl_ratio = dec("0.3");
        s.utility_ratio = Decimal::ZERO;
        s.fixed_cost_yen = 0;
        // ideal_sales = 100 / 0.3 = 333.33…, rounds to 333;
        // contrib = 333.33… - 100 = 233.33…, rounds to 233 (not 333 - 100
        // of pre-rounded parts, which would also be 233 here, so check a
        // half-way case explicitly below).
        let est = estimate(100, &s).unwrap();
        assert_eq!(est.ideal_sales_yen, 333);
        assert_eq!(est.contrib_yen, 233);

        // 25 / 0.4 = 62.5 rounds half-up to 63.
        s.food_ratio = dec("0.4");
        s.fl_ratio = dec("0.4");
        let est = estimate(25, &s).unwrap();
        assert_eq!(est.ideal_sales_yen, 63);
    }

    #[test]
    fn zero_food_ratio_yields_no_estimate() {
        let mut s = setting();
        s.food_ratio = Decimal::ZERO;
        assert!(estimate(300_000, &s).is_none());
    }

    #[test]
    fn zero_cogs_yields_no_estimate() {
        assert!(estimate(0, &setting()).is_none());
    }
}
