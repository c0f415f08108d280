//! Monthly usage reconciliation
//!
//! Derives per-item begin/purchased/end/used quantities for an ascending
//! month window from two maps of materialized rows: purchase quantities per
//! item-month and month-end counted quantities per item-month.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::period::MonthKey;

/// One item-month of the reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct MonthlyUsage {
    /// Previous month's ending quantity (0 for the first month).
    pub begin_qty: i64,
    /// Purchase quantity delivered within the month.
    pub pur_qty: i64,
    /// Latest counted quantity within the month (0 when not counted).
    pub end_qty: i64,
    /// `begin + purchased - end`. Negative values are surfaced as-is;
    /// they signal over-counting, not a correction to apply.
    pub used_qty: i64,
}

/// Reconciled usage for one item across the whole window.
#[derive(Debug, Clone, Serialize)]
pub struct ItemUsage {
    pub item_id: i64,
    pub per_month: BTreeMap<MonthKey, MonthlyUsage>,
    pub total_pur: i64,
    pub total_used: i64,
    /// Ending quantity of the final month in the window.
    pub total_end: i64,
}

/// Per-item-month quantity map, keyed by item id then month.
pub type QtyByItemMonth = HashMap<i64, HashMap<MonthKey, i64>>;

/// Reconcile usage across an ascending month window.
///
/// Months must be processed in chronological order because each month's
/// beginning quantity is the previous month's end; the carried quantity
/// starts at zero for the first month. Items appearing in either map are
/// included, so goods purchased but never counted and internal goods
/// counted but never purchased both show up.
pub fn reconcile(
    months: &[MonthKey],
    purchased: &QtyByItemMonth,
    month_end: &QtyByItemMonth,
) -> Vec<ItemUsage> {
    let mut item_ids: Vec<i64> = purchased.keys().chain(month_end.keys()).copied().collect();
    item_ids.sort_unstable();
    item_ids.dedup();

    let mut rows = Vec::with_capacity(item_ids.len());
    for item_id in item_ids {
        let mut per_month = BTreeMap::new();
        let mut total_pur = 0;
        let mut total_used = 0;
        let mut total_end = 0;
        let mut prev_end_qty = 0;

        for &ym in months {
            let pur_qty = month_qty(purchased, item_id, ym);
            let end_qty = month_qty(month_end, item_id, ym);
            let begin_qty = prev_end_qty;
            let used_qty = begin_qty + pur_qty - end_qty;

            per_month.insert(
                ym,
                MonthlyUsage {
                    begin_qty,
                    pur_qty,
                    end_qty,
                    used_qty,
                },
            );

            total_pur += pur_qty;
            total_used += used_qty;
            total_end = end_qty;
            prev_end_qty = end_qty;
        }

        rows.push(ItemUsage {
            item_id,
            per_month,
            total_pur,
            total_used,
            total_end,
        });
    }

    rows
}

fn month_qty(map: &QtyByItemMonth, item_id: i64, ym: MonthKey) -> i64 {
    map.get(&item_id)
        .and_then(|by_month| by_month.get(&ym))
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn qty_map(entries: &[(i64, MonthKey, i64)]) -> QtyByItemMonth {
        let mut map = QtyByItemMonth::new();
        for &(item_id, month, qty) in entries {
            map.entry(item_id).or_default().insert(month, qty);
        }
        map
    }

    #[test]
    fn begin_carries_previous_month_end() {
        let months = [ym(2024, 1), ym(2024, 2), ym(2024, 3)];
        let purchased = qty_map(&[(7, ym(2024, 1), 30), (7, ym(2024, 2), 10)]);
        let month_end = qty_map(&[(7, ym(2024, 1), 12), (7, ym(2024, 3), 4)]);

        let rows = reconcile(&months, &purchased, &month_end);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        let jan = row.per_month[&ym(2024, 1)];
        assert_eq!((jan.begin_qty, jan.pur_qty, jan.end_qty, jan.used_qty), (0, 30, 12, 18));

        // February had no count: end 0, everything counts as used.
        let feb = row.per_month[&ym(2024, 2)];
        assert_eq!((feb.begin_qty, feb.pur_qty, feb.end_qty, feb.used_qty), (12, 10, 0, 22));

        // March begins from February's (zero) end.
        let mar = row.per_month[&ym(2024, 3)];
        assert_eq!((mar.begin_qty, mar.pur_qty, mar.end_qty, mar.used_qty), (0, 0, 4, -4));

        assert_eq!(row.total_pur, 40);
        assert_eq!(row.total_end, 4);
    }

    #[test]
    fn telescoping_sum_holds() {
        let months = [ym(2024, 1), ym(2024, 2), ym(2024, 3)];
        let purchased = qty_map(&[
            (1, ym(2024, 1), 5),
            (1, ym(2024, 2), 9),
            (1, ym(2024, 3), 2),
        ]);
        let month_end = qty_map(&[(1, ym(2024, 1), 3), (1, ym(2024, 2), 7), (1, ym(2024, 3), 1)]);

        let rows = reconcile(&months, &purchased, &month_end);
        let row = &rows[0];
        // Sum of used = sum of purchased + begin[0] - end[last].
        assert_eq!(row.total_used, row.total_pur - row.total_end);
    }

    #[test]
    fn includes_items_from_either_map() {
        let months = [ym(2024, 1)];
        // Item 1 purchased but never counted; item 2 (internal goods)
        // counted but never purchased.
        let purchased = qty_map(&[(1, ym(2024, 1), 6)]);
        let month_end = qty_map(&[(2, ym(2024, 1), 9)]);

        let rows = reconcile(&months, &purchased, &month_end);
        let ids: Vec<i64> = rows.iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(rows[0].per_month[&ym(2024, 1)].used_qty, 6);
        assert_eq!(rows[1].per_month[&ym(2024, 1)].used_qty, -9);
    }

    #[test]
    fn empty_window_produces_empty_totals() {
        let purchased = qty_map(&[(1, ym(2024, 1), 6)]);
        let rows = reconcile(&[], &purchased, &QtyByItemMonth::new());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_pur, 0);
        assert_eq!(rows[0].total_used, 0);
    }
}
