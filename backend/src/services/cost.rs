//! Monthly COGS report service
//!
//! Builds the rolling cost-of-goods-sold series: purchase amounts per
//! month, ending inventory valued by walking purchase lots most-recent-
//! first against each month's latest positive count, beginning inventory
//! carried forward, and `cogs = begin + purchases - end`.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use shared::cogs::CogsSeries;
use shared::period::{window_date_range, MonthKey};
use shared::valuation::{fifo_end_value, PurchaseLot};

use crate::error::{AppError, AppResult};

/// COGS report service
#[derive(Clone)]
pub struct CostReportService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct MonthAmountRow {
    ym: String,
    total_amount: i64,
}

/// Latest count per (store, item, month), the period-end snapshot
#[derive(Debug, FromRow)]
struct MonthEndCountRow {
    store_id: i64,
    item_id: i64,
    ym: String,
    count_date: NaiveDate,
    counted_qty: i64,
}

#[derive(Debug, FromRow)]
struct LotRow {
    store_id: i64,
    item_id: i64,
    id: i64,
    delivery_date: NaiveDate,
    quantity: i64,
    unit_price: i64,
}

impl CostReportService {
    /// Create a new CostReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Build the COGS series for an ascending month window, optionally
    /// filtered to one store.
    pub async fn cost_report(
        &self,
        months: &[MonthKey],
        store_id: Option<i64>,
    ) -> AppResult<CogsSeries> {
        let Some((start_date, end_date)) = window_date_range(months) else {
            return Ok(CogsSeries::build(months, &BTreeMap::new(), &BTreeMap::new()));
        };

        let t0 = Instant::now();

        // 1) Purchase amounts per month. The stored line total is
        // trustworthy for plain sums; only lot valuation recomputes it.
        let pur_rows: Vec<MonthAmountRow> = sqlx::query_as(
            r#"
            SELECT
                TO_CHAR(p.delivery_date, 'YYYY-MM') AS ym,
                COALESCE(SUM(p.amount), 0)::bigint AS total_amount
            FROM purchases p
            WHERE p.delivery_date >= $1
              AND p.delivery_date < $2
              AND p.is_deleted = FALSE
              AND ($3::bigint IS NULL OR p.store_id = $3)
            GROUP BY ym
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;

        let mut purchases_by_month = BTreeMap::new();
        for row in pur_rows {
            purchases_by_month.insert(parse_ym(&row.ym)?, row.total_amount);
        }

        // 2) Ending inventory: FIFO-value each month's latest positive
        // count from the purchase lots delivered up to the count date.
        let end_inv_by_month = self
            .month_end_inventory(months, store_id, start_date, end_date)
            .await?;

        tracing::debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            months = months.len(),
            "cost report built"
        );

        Ok(CogsSeries::build(months, &purchases_by_month, &end_inv_by_month))
    }

    /// FIFO-valued ending inventory per month, summed over items (and
    /// stores when unfiltered). Two batched queries: the month-end count
    /// snapshots, then every purchase lot the valuations can touch.
    async fn month_end_inventory(
        &self,
        months: &[MonthKey],
        store_id: Option<i64>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<BTreeMap<MonthKey, i64>> {
        let count_rows: Vec<MonthEndCountRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (sc.store_id, sc.item_id, TO_CHAR(sc.count_date, 'YYYY-MM'))
                sc.store_id,
                sc.item_id,
                TO_CHAR(sc.count_date, 'YYYY-MM') AS ym,
                sc.count_date,
                sc.counted_qty
            FROM stock_counts sc
            WHERE sc.count_date >= $1
              AND sc.count_date < $2
              AND ($3::bigint IS NULL OR sc.store_id = $3)
            ORDER BY
                sc.store_id,
                sc.item_id,
                TO_CHAR(sc.count_date, 'YYYY-MM'),
                sc.count_date DESC,
                sc.id DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;

        // Zero counts carry no value; only positive snapshots get priced.
        let snapshots: Vec<MonthEndCountRow> = count_rows
            .into_iter()
            .filter(|r| r.counted_qty > 0)
            .collect();

        let mut end_inv_by_month: BTreeMap<MonthKey, i64> =
            months.iter().map(|&ym| (ym, 0)).collect();
        if snapshots.is_empty() {
            return Ok(end_inv_by_month);
        }

        let mut item_ids: Vec<i64> = snapshots.iter().map(|s| s.item_id).collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        let lot_rows: Vec<LotRow> = sqlx::query_as(
            r#"
            SELECT
                p.store_id,
                p.item_id,
                p.id,
                p.delivery_date,
                p.quantity,
                p.unit_price
            FROM purchases p
            WHERE p.is_deleted = FALSE
              AND p.delivery_date < $1
              AND ($2::bigint IS NULL OR p.store_id = $2)
              AND p.item_id = ANY($3)
            "#,
        )
        .bind(end_date)
        .bind(store_id)
        .bind(&item_ids)
        .fetch_all(&self.db)
        .await?;

        let mut lots_by_key: HashMap<(i64, i64), Vec<PurchaseLot>> = HashMap::new();
        for row in lot_rows {
            lots_by_key
                .entry((row.store_id, row.item_id))
                .or_default()
                .push(PurchaseLot {
                    id: row.id,
                    delivery_date: row.delivery_date,
                    quantity: row.quantity,
                    unit_price: row.unit_price,
                });
        }
        let empty: Vec<PurchaseLot> = Vec::new();

        for snap in snapshots {
            let ym = parse_ym(&snap.ym)?;
            // Only lots delivered on or before the count date belong to
            // this period's snapshot.
            let lots: Vec<PurchaseLot> = lots_by_key
                .get(&(snap.store_id, snap.item_id))
                .unwrap_or(&empty)
                .iter()
                .filter(|l| l.delivery_date <= snap.count_date)
                .copied()
                .collect();

            let valuation = fifo_end_value(&lots, snap.counted_qty);
            if valuation.shortfall(snap.counted_qty) > 0 {
                // Counted stock exceeds recorded purchases: known data
                // quality issue, the valuation under-reports.
                tracing::warn!(
                    store_id = snap.store_id,
                    item_id = snap.item_id,
                    ym = %ym,
                    end_qty = snap.counted_qty,
                    covered_qty = valuation.covered_qty,
                    "FIFO valuation under-covered by purchase history"
                );
            }

            if let Some(total) = end_inv_by_month.get_mut(&ym) {
                *total += valuation.value;
            }
        }

        Ok(end_inv_by_month)
    }
}

fn parse_ym(ym: &str) -> AppResult<MonthKey> {
    ym.parse()
        .map_err(|e| AppError::Internal(format!("bad month key from query: {e}")))
}
