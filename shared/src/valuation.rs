//! System quantity and unit cost resolution
//!
//! These functions form the valuation core: they take materialized ledger
//! rows (purchase lots, count entries) and derive on-hand quantities,
//! weighted-average unit prices, and FIFO period-end valuations. All
//! database access stays in the backend services, which batch the queries
//! and feed the rows in.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A non-deleted purchase lot materialized from the purchase ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLot {
    pub id: i64,
    pub delivery_date: NaiveDate,
    pub quantity: i64,
    /// Unit price in whole yen.
    pub unit_price: i64,
}

impl PurchaseLot {
    /// Line value recomputed from quantity and unit price. The stored
    /// ledger `amount` is never consulted for valuation math.
    pub fn value(&self) -> i64 {
        self.quantity * self.unit_price
    }
}

/// A stock count entry materialized from the count ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEntry {
    pub id: i64,
    pub count_date: NaiveDate,
    pub counted_qty: i64,
}

/// The effective count on or before `as_of`.
///
/// When several counts share the latest date (re-entry), the highest id
/// wins: latest insertion is "the" count for that date.
pub fn latest_count(counts: &[CountEntry], as_of: NaiveDate) -> Option<CountEntry> {
    counts
        .iter()
        .filter(|c| c.count_date <= as_of)
        .max_by_key(|c| (c.count_date, c.id))
        .copied()
}

/// Derived on-hand quantity as of a date: the last physical count plus
/// purchases delivered after it.
///
/// Purchases delivered on the count date itself are excluded by the strict
/// `>` comparison — the count is a point-in-time snapshot taken before
/// same-day shipments arrive. With no prior count, all purchase history up
/// to `as_of` is summed.
pub fn system_quantity(counts: &[CountEntry], lots: &[PurchaseLot], as_of: NaiveDate) -> i64 {
    match latest_count(counts, as_of) {
        Some(last) => {
            let after: i64 = lots
                .iter()
                .filter(|l| l.delivery_date > last.count_date && l.delivery_date <= as_of)
                .map(|l| l.quantity)
                .sum();
            last.counted_qty + after
        }
        None => lots
            .iter()
            .filter(|l| l.delivery_date <= as_of)
            .map(|l| l.quantity)
            .sum(),
    }
}

/// Quantity-weighted average unit price over the given lots.
///
/// Returns `Decimal::ZERO` when total quantity is zero; the quotient is
/// not pre-rounded, callers round once at the output boundary.
pub fn weighted_average_unit_price(lots: &[PurchaseLot]) -> Decimal {
    let total_qty: i64 = lots.iter().map(|l| l.quantity).sum();
    if total_qty == 0 {
        return Decimal::ZERO;
    }
    let total_value: i64 = lots.iter().map(|l| l.value()).sum();
    Decimal::from(total_value) / Decimal::from(total_qty)
}

/// Result of a FIFO period-end valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FifoValuation {
    /// Monetary value of the covered quantity, in whole yen.
    pub value: i64,
    /// Quantity actually covered by purchase history. Less than the
    /// requested end quantity when counted stock exceeds recorded
    /// purchases — a data anomaly that under-reports rather than fails.
    pub covered_qty: i64,
}

impl FifoValuation {
    pub fn shortfall(&self, end_qty: i64) -> i64 {
        end_qty - self.covered_qty
    }
}

/// Value an end-of-period on-hand quantity by consuming purchase lots
/// most-recent-first.
///
/// Lots are walked ordered by `delivery_date DESC, id DESC`; a lot is
/// fully included while the running quantity stays within `end_qty`,
/// prorated by unit price when it straddles the boundary, and excluded
/// once the boundary is already passed. This values the most recently
/// acquired `end_qty` units — "what's still on the shelf".
///
/// The caller restricts `lots` to `delivery_date <= count_date` for the
/// period snapshot being valued.
pub fn fifo_end_value(lots: &[PurchaseLot], end_qty: i64) -> FifoValuation {
    let mut ordered: Vec<&PurchaseLot> = lots.iter().collect();
    ordered.sort_by(|a, b| (b.delivery_date, b.id).cmp(&(a.delivery_date, a.id)));

    let mut running = 0i64;
    let mut value = 0i64;
    for lot in ordered {
        let prev_running = running;
        if prev_running >= end_qty {
            break;
        }
        running += lot.quantity;
        if running <= end_qty {
            value += lot.value();
        } else {
            value += (end_qty - prev_running) * lot.unit_price;
        }
    }

    FifoValuation {
        value,
        covered_qty: running.min(end_qty).max(0),
    }
}
