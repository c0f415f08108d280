//! Monthly COGS series construction
//!
//! Rolls monthly purchase totals and FIFO-valued ending inventory into a
//! cost-of-goods-sold series: `cogs = begin + purchases - end`, with each
//! month's beginning inventory carried from the previous month's end. The
//! backend cost-report service materializes the two input maps from the
//! ledgers; this module owns the arithmetic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::period::MonthKey;

/// A 13-month (or caller-chosen window) COGS series. All four maps carry
/// identical month-key coverage, zero-filled, so column totals line up.
#[derive(Debug, Clone, Serialize)]
pub struct CogsSeries {
    pub months: Vec<MonthKey>,
    /// Purchase amounts per month, whole yen.
    pub purchases_by_month: BTreeMap<MonthKey, i64>,
    /// Beginning inventory value per month (previous month's end, 0 first).
    pub beg_inv_by_month: BTreeMap<MonthKey, i64>,
    /// FIFO-valued ending inventory per month.
    pub end_inv_by_month: BTreeMap<MonthKey, i64>,
    /// `begin + purchases - end` per month.
    pub cogs_by_month: BTreeMap<MonthKey, i64>,
    pub purchases_total: i64,
    pub beg_inv_total: i64,
    pub end_inv_total: i64,
    pub cogs_total: i64,
}

impl CogsSeries {
    /// Build the series for an ascending month window. Input maps may be
    /// sparse; missing months read as zero. Map entries outside the window
    /// are ignored.
    pub fn build(
        months: &[MonthKey],
        purchases: &BTreeMap<MonthKey, i64>,
        end_inv: &BTreeMap<MonthKey, i64>,
    ) -> Self {
        let mut purchases_by_month = BTreeMap::new();
        let mut beg_inv_by_month = BTreeMap::new();
        let mut end_inv_by_month = BTreeMap::new();
        let mut cogs_by_month = BTreeMap::new();

        let mut prev_end = 0;
        for &ym in months {
            let pur = purchases.get(&ym).copied().unwrap_or(0);
            let end = end_inv.get(&ym).copied().unwrap_or(0);
            let beg = prev_end;

            purchases_by_month.insert(ym, pur);
            beg_inv_by_month.insert(ym, beg);
            end_inv_by_month.insert(ym, end);
            cogs_by_month.insert(ym, beg + pur - end);

            prev_end = end;
        }

        let purchases_total = purchases_by_month.values().sum();
        let beg_inv_total = beg_inv_by_month.values().sum();
        let end_inv_total = end_inv_by_month.values().sum();
        let cogs_total = cogs_by_month.values().sum();

        Self {
            months: months.to_vec(),
            purchases_by_month,
            beg_inv_by_month,
            end_inv_by_month,
            cogs_by_month,
            purchases_total,
            beg_inv_total,
            end_inv_total,
            cogs_total,
        }
    }

    /// COGS for a single month, `None` outside the window.
    pub fn cogs_for(&self, ym: MonthKey) -> Option<i64> {
        self.cogs_by_month.get(&ym).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn begin_is_previous_end_and_identity_holds() {
        let months = [ym(2024, 1), ym(2024, 2), ym(2024, 3)];
        let purchases = BTreeMap::from([(ym(2024, 1), 1000), (ym(2024, 2), 800)]);
        let end_inv = BTreeMap::from([(ym(2024, 1), 300), (ym(2024, 3), 150)]);

        let series = CogsSeries::build(&months, &purchases, &end_inv);

        assert_eq!(series.beg_inv_by_month[&ym(2024, 1)], 0);
        assert_eq!(series.beg_inv_by_month[&ym(2024, 2)], 300);
        assert_eq!(series.beg_inv_by_month[&ym(2024, 3)], 0);

        for &m in &months {
            assert_eq!(
                series.cogs_by_month[&m],
                series.beg_inv_by_month[&m] + series.purchases_by_month[&m]
                    - series.end_inv_by_month[&m]
            );
        }
        assert_eq!(series.cogs_by_month[&ym(2024, 1)], 700);
        assert_eq!(series.cogs_by_month[&ym(2024, 2)], 1100);
        assert_eq!(series.cogs_by_month[&ym(2024, 3)], -150);
    }

    #[test]
    fn all_maps_share_window_coverage() {
        let months = [ym(2024, 1), ym(2024, 2)];
        // An entry outside the window must not leak in.
        let purchases = BTreeMap::from([(ym(2023, 12), 999)]);
        let series = CogsSeries::build(&months, &purchases, &BTreeMap::new());

        for map in [
            &series.purchases_by_month,
            &series.beg_inv_by_month,
            &series.end_inv_by_month,
            &series.cogs_by_month,
        ] {
            let keys: Vec<MonthKey> = map.keys().copied().collect();
            assert_eq!(keys, months);
        }
        assert_eq!(series.purchases_total, 0);
    }
}
