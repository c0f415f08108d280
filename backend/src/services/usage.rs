//! Monthly usage report service
//!
//! Materializes per-item-month purchase quantities and month-end counted
//! quantities with two grouped queries, then hands the maps to the shared
//! reconciler: `used = begin + purchased - end`, begin carried from the
//! previous month's end across the whole window.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use shared::period::{window_date_range, MonthKey};
use shared::usage::{self, MonthlyUsage, QtyByItemMonth};

use crate::error::{AppError, AppResult};

/// Monthly usage report service
#[derive(Clone)]
pub struct UsageReportService {
    db: PgPool,
}

/// Reconciled usage for one item, with master data attached
#[derive(Debug, Clone, Serialize)]
pub struct UsageReportRow {
    pub item_id: i64,
    pub item_code: String,
    pub item_name: String,
    pub per_month: BTreeMap<MonthKey, MonthlyUsage>,
    pub total_pur: i64,
    pub total_used: i64,
    pub total_end: i64,
}

#[derive(Debug, FromRow)]
struct QtyByMonthRow {
    item_id: i64,
    ym: String,
    qty: i64,
}

#[derive(Debug, FromRow)]
struct ItemMetaRow {
    id: i64,
    code: String,
    name: String,
}

impl UsageReportService {
    /// Create a new UsageReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Reconcile usage per item across an ascending month window, with
    /// optional store and supplier filters. Items appear when they were
    /// either purchased or counted inside the window; rows are sorted by
    /// total usage descending.
    pub async fn monthly_usage(
        &self,
        months: &[MonthKey],
        store_id: Option<i64>,
        supplier_id: Option<i64>,
    ) -> AppResult<Vec<UsageReportRow>> {
        let Some((start_date, end_date)) = window_date_range(months) else {
            return Ok(Vec::new());
        };

        // 1) Purchase quantity per item-month.
        let pur_rows: Vec<QtyByMonthRow> = sqlx::query_as(
            r#"
            SELECT
                p.item_id,
                TO_CHAR(p.delivery_date, 'YYYY-MM') AS ym,
                COALESCE(SUM(p.quantity), 0)::bigint AS qty
            FROM purchases p
            JOIN items i ON i.id = p.item_id
            WHERE p.delivery_date >= $1
              AND p.delivery_date < $2
              AND p.is_deleted = FALSE
              AND ($3::bigint IS NULL OR p.store_id = $3)
              AND ($4::bigint IS NULL OR i.supplier_id = $4)
            GROUP BY p.item_id, ym
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(store_id)
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;

        let purchased = into_qty_map(pur_rows)?;

        // 2) Month-end counted quantity per item-month: the latest count
        // inside each month (latest id wins on a shared date), summed
        // across stores when no store filter is given.
        let inv_rows: Vec<QtyByMonthRow> = sqlx::query_as(
            r#"
            WITH last_counts AS (
                SELECT DISTINCT ON (sc.store_id, sc.item_id, TO_CHAR(sc.count_date, 'YYYY-MM'))
                    sc.store_id,
                    sc.item_id,
                    TO_CHAR(sc.count_date, 'YYYY-MM') AS ym,
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
            )
            SELECT
                item_id,
                ym,
                SUM(counted_qty)::bigint AS qty
            FROM last_counts
            GROUP BY item_id, ym
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;

        let month_end = into_qty_map(inv_rows)?;

        // 3) Item master for everything involved; the supplier filter
        // applies here too so counted-only items of other suppliers drop.
        let mut item_ids: Vec<i64> = purchased.keys().chain(month_end.keys()).copied().collect();
        item_ids.sort_unstable();
        item_ids.dedup();

        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let meta_rows: Vec<ItemMetaRow> = sqlx::query_as(
            r#"
            SELECT id, code, name
            FROM items
            WHERE id = ANY($1)
              AND ($2::bigint IS NULL OR supplier_id = $2)
            "#,
        )
        .bind(&item_ids)
        .bind(supplier_id)
        .fetch_all(&self.db)
        .await?;

        let meta: std::collections::HashMap<i64, ItemMetaRow> =
            meta_rows.into_iter().map(|r| (r.id, r)).collect();

        // 4) Pure reconciliation, then attach master data.
        let mut rows: Vec<UsageReportRow> = usage::reconcile(months, &purchased, &month_end)
            .into_iter()
            .filter_map(|item| {
                let m = meta.get(&item.item_id)?;
                Some(UsageReportRow {
                    item_id: item.item_id,
                    item_code: m.code.clone(),
                    item_name: m.name.clone(),
                    per_month: item.per_month,
                    total_pur: item.total_pur,
                    total_used: item.total_used,
                    total_end: item.total_end,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_used
                .cmp(&a.total_used)
                .then_with(|| a.item_code.cmp(&b.item_code))
        });

        Ok(rows)
    }
}

fn into_qty_map(rows: Vec<QtyByMonthRow>) -> AppResult<QtyByItemMonth> {
    let mut map = QtyByItemMonth::new();
    for row in rows {
        let ym: MonthKey = row
            .ym
            .parse()
            .map_err(|e| AppError::Internal(format!("bad month key from query: {e}")))?;
        map.entry(row.item_id).or_default().insert(ym, row.qty);
    }
    Ok(map)
}
