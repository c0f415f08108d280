//! Stock status service: system quantities and on-screen valuation
//!
//! The count screen enumerates hundreds of items, so the list path runs a
//! fixed number of batched queries (one per stage) instead of per-item
//! sub-queries. Row assembly after the batches is pure in-memory work.

use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Stock status service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// One item row on the stock count screen
#[derive(Debug, Clone, Serialize)]
pub struct StockStatusRow {
    pub item_id: i64,
    pub item_code: String,
    pub item_name: String,
    pub is_internal: bool,
    /// Date of the count the system quantity opens from, if any.
    pub last_count_date: Option<NaiveDate>,
    /// Opening count plus purchases delivered after it.
    pub system_qty: i64,
    /// Quantity-weighted average purchase price up to the status date.
    pub unit_price: Decimal,
    /// `system_qty * unit_price`.
    pub stock_amount: Decimal,
    /// Count already entered for the status date, for input defaults.
    pub counted_qty: Option<i64>,
}

/// Row for the item universe query
#[derive(Debug, FromRow)]
struct BaseItemRow {
    item_id: i64,
    item_code: String,
    item_name: String,
    is_internal: bool,
}

#[derive(Debug, FromRow)]
struct LastCountRow {
    item_id: i64,
    last_count_date: NaiveDate,
    opening_qty: i64,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Derive the system quantity for one item at one store as of a date:
    /// the latest count on or before the date (latest id wins on ties)
    /// plus non-deleted purchases delivered strictly after the count date.
    /// With no prior count, all purchase history up to the date is summed.
    pub async fn resolve_system_qty(
        &self,
        store_id: i64,
        item_id: i64,
        as_of: NaiveDate,
    ) -> AppResult<i64> {
        let last: Option<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT count_date, counted_qty
            FROM stock_counts
            WHERE store_id = $1 AND item_id = $2 AND count_date <= $3
            ORDER BY count_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(store_id)
        .bind(item_id)
        .bind(as_of)
        .fetch_optional(&self.db)
        .await?;

        let last_count_date = last.map(|(d, _)| d);
        let opening_qty = last.map(|(_, q)| q).unwrap_or(0);

        let purchased_after: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint
            FROM purchases
            WHERE store_id = $1
              AND item_id = $2
              AND is_deleted = FALSE
              AND delivery_date <= $3
              AND ($4::date IS NULL OR delivery_date > $4)
            "#,
        )
        .bind(store_id)
        .bind(item_id)
        .bind(as_of)
        .bind(last_count_date)
        .fetch_one(&self.db)
        .await?;

        Ok(opening_qty + purchased_after)
    }

    /// Full stock status for one store as of a date, batched.
    ///
    /// Stages: (1) item universe, (2) last count per item, (3) purchases
    /// after each item's last count, (4) weighted average price per item,
    /// (5) count already entered on the date. Items appear when their
    /// system quantity is positive or they are internal goods.
    pub async fn list_stock_status(
        &self,
        store_id: i64,
        as_of: NaiveDate,
    ) -> AppResult<Vec<StockStatusRow>> {
        let t0 = Instant::now();

        // 1) Item universe: anything with purchase history at this store,
        // plus internal goods which have none.
        let base_rows: Vec<BaseItemRow> = sqlx::query_as(
            r#"
            SELECT
                i.id   AS item_id,
                i.code AS item_code,
                i.name AS item_name,
                i.is_internal
            FROM items i
            WHERE i.is_internal
               OR EXISTS (
                    SELECT 1
                    FROM purchases p
                    WHERE p.store_id = $1
                      AND p.item_id = i.id
                      AND p.is_deleted = FALSE
                      AND p.delivery_date <= $2
               )
            ORDER BY i.code, i.id
            "#,
        )
        .bind(store_id)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        tracing::debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            rows = base_rows.len(),
            "stock status: item universe"
        );

        if base_rows.is_empty() {
            return Ok(Vec::new());
        }
        let item_ids: Vec<i64> = base_rows.iter().map(|r| r.item_id).collect();

        // 2) Last count per item (opening quantity + boundary date).
        let t1 = Instant::now();
        let last_rows: Vec<LastCountRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (item_id)
                item_id,
                count_date  AS last_count_date,
                counted_qty AS opening_qty
            FROM stock_counts
            WHERE store_id = $1
              AND item_id = ANY($2)
              AND count_date <= $3
            ORDER BY item_id, count_date DESC, id DESC
            "#,
        )
        .bind(store_id)
        .bind(&item_ids)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        let last_map: HashMap<i64, (i64, NaiveDate)> = last_rows
            .into_iter()
            .map(|r| (r.item_id, (r.opening_qty, r.last_count_date)))
            .collect();

        tracing::debug!(
            elapsed_ms = t1.elapsed().as_millis() as u64,
            rows = last_map.len(),
            "stock status: last counts"
        );

        // 3) Purchases delivered after each item's last count. Strictly
        // after: same-day deliveries are inside the counted figure.
        let t2 = Instant::now();
        let after_rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            WITH last_cnt AS (
                SELECT DISTINCT ON (item_id)
                    item_id,
                    count_date AS last_count_date
                FROM stock_counts
                WHERE store_id = $1
                  AND item_id = ANY($2)
                  AND count_date <= $3
                ORDER BY item_id, count_date DESC, id DESC
            )
            SELECT
                p.item_id,
                COALESCE(SUM(p.quantity), 0)::bigint AS qty_after
            FROM purchases p
            LEFT JOIN last_cnt lc ON lc.item_id = p.item_id
            WHERE p.store_id = $1
              AND p.item_id = ANY($2)
              AND p.is_deleted = FALSE
              AND p.delivery_date <= $3
              AND (lc.last_count_date IS NULL OR p.delivery_date > lc.last_count_date)
            GROUP BY p.item_id
            "#,
        )
        .bind(store_id)
        .bind(&item_ids)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        let after_map: HashMap<i64, i64> = after_rows.into_iter().collect();

        tracing::debug!(
            elapsed_ms = t2.elapsed().as_millis() as u64,
            rows = after_map.len(),
            "stock status: purchases after last count"
        );

        // 4) Weighted average purchase price up to the status date.
        let t3 = Instant::now();
        let price_rows: Vec<(i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT
                item_id,
                CASE
                    WHEN SUM(quantity) > 0 THEN
                        SUM(quantity * unit_price)::numeric / SUM(quantity)
                    ELSE 0
                END AS unit_price
            FROM purchases
            WHERE store_id = $1
              AND item_id = ANY($2)
              AND is_deleted = FALSE
              AND delivery_date <= $3
            GROUP BY item_id
            "#,
        )
        .bind(store_id)
        .bind(&item_ids)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        let price_map: HashMap<i64, Decimal> = price_rows.into_iter().collect();

        tracing::debug!(
            elapsed_ms = t3.elapsed().as_millis() as u64,
            rows = price_map.len(),
            "stock status: weighted prices"
        );

        // 5) Counts already entered on this date (re-entry: latest id wins).
        let t4 = Instant::now();
        let counted_rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (item_id)
                item_id,
                counted_qty
            FROM stock_counts
            WHERE store_id = $1
              AND item_id = ANY($2)
              AND count_date = $3
            ORDER BY item_id, id DESC
            "#,
        )
        .bind(store_id)
        .bind(&item_ids)
        .bind(as_of)
        .fetch_all(&self.db)
        .await?;

        let counted_map: HashMap<i64, i64> = counted_rows.into_iter().collect();

        tracing::debug!(
            elapsed_ms = t4.elapsed().as_millis() as u64,
            rows = counted_map.len(),
            "stock status: counts on date"
        );

        // 6) Assemble rows, no further queries.
        let mut items = Vec::with_capacity(base_rows.len());
        for row in base_rows {
            let (opening_qty, last_count_date) = match last_map.get(&row.item_id) {
                Some(&(qty, date)) => (qty, Some(date)),
                None => (0, None),
            };
            let purchased_after = after_map.get(&row.item_id).copied().unwrap_or(0);
            let system_qty = opening_qty + purchased_after;

            if system_qty <= 0 && !row.is_internal {
                continue;
            }

            let unit_price = price_map.get(&row.item_id).copied().unwrap_or(Decimal::ZERO);

            items.push(StockStatusRow {
                item_id: row.item_id,
                item_code: row.item_code,
                item_name: row.item_name,
                is_internal: row.is_internal,
                last_count_date,
                system_qty,
                unit_price,
                stock_amount: Decimal::from(system_qty) * unit_price,
                counted_qty: counted_map.get(&row.item_id).copied(),
            });
        }

        tracing::debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            items = items.len(),
            "stock status: total"
        );

        Ok(items)
    }

    /// Most recent distinct count dates for a store, newest first.
    pub async fn latest_count_dates(
        &self,
        store_id: i64,
        limit: i64,
    ) -> AppResult<Vec<NaiveDate>> {
        let dates: Vec<(NaiveDate,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT count_date
            FROM stock_counts
            WHERE store_id = $1
            ORDER BY count_date DESC
            LIMIT $2
            "#,
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(dates.into_iter().map(|(d,)| d).collect())
    }
}
