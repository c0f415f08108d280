//! Purchase report service: monthly pivots by supplier and by item
//!
//! Window columns come zero-filled so every row carries identical month
//! coverage and column totals line up.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use shared::period::{window_date_range, MonthKey};

use crate::error::{AppError, AppResult};

/// Purchase report service
#[derive(Clone)]
pub struct PurchaseReportService {
    db: PgPool,
}

/// Monthly purchase amounts for one supplier
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPurchaseRow {
    /// 0 when purchases have no supplier attached.
    pub supplier_id: i64,
    pub supplier_name: String,
    pub amount_by_month: BTreeMap<MonthKey, i64>,
    pub total_amount: i64,
}

/// Supplier pivot over the report window
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReport {
    pub months: Vec<MonthKey>,
    pub rows: Vec<SupplierPurchaseRow>,
    /// Column totals aligned with `months`.
    pub month_totals: Vec<i64>,
}

/// Monthly amounts, quantities and derived unit price for one item
#[derive(Debug, Clone, Serialize)]
pub struct ItemPurchaseRow {
    pub item_id: i64,
    pub item_code: String,
    pub item_name: String,
    pub amount_by_month: BTreeMap<MonthKey, i64>,
    pub qty_by_month: BTreeMap<MonthKey, i64>,
    /// `amount / qty` per month, zero when nothing was purchased.
    pub unit_price_by_month: BTreeMap<MonthKey, Decimal>,
    pub total_amount: i64,
    pub total_qty: i64,
}

/// Per-item breakdown for one supplier
#[derive(Debug, Clone, Serialize)]
pub struct SupplierItemReport {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub months: Vec<MonthKey>,
    pub rows: Vec<ItemPurchaseRow>,
    pub month_totals_amount: Vec<i64>,
    pub month_totals_qty: Vec<i64>,
}

#[derive(Debug, FromRow)]
struct SupplierMonthRow {
    supplier_id: i64,
    supplier_name: String,
    ym: String,
    total_amount: i64,
}

#[derive(Debug, FromRow)]
struct ItemMonthRow {
    item_id: i64,
    item_code: String,
    item_name: String,
    ym: String,
    total_qty: i64,
    total_amount: i64,
}

impl PurchaseReportService {
    /// Create a new PurchaseReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Purchase amounts pivoted supplier x month over the window,
    /// optionally filtered to one store.
    pub async fn monthly_by_supplier(
        &self,
        months: &[MonthKey],
        store_id: Option<i64>,
    ) -> AppResult<PurchaseReport> {
        let Some((start_date, end_date)) = window_date_range(months) else {
            return Ok(PurchaseReport {
                months: Vec::new(),
                rows: Vec::new(),
                month_totals: Vec::new(),
            });
        };

        let raw: Vec<SupplierMonthRow> = sqlx::query_as(
            r#"
            SELECT
                COALESCE(s.id, 0) AS supplier_id,
                COALESCE(s.name, '(no supplier)') AS supplier_name,
                TO_CHAR(p.delivery_date, 'YYYY-MM') AS ym,
                COALESCE(SUM(p.amount), 0)::bigint AS total_amount
            FROM purchases p
            LEFT JOIN items i     ON p.item_id = i.id
            LEFT JOIN suppliers s ON i.supplier_id = s.id
            WHERE p.is_deleted = FALSE
              AND p.delivery_date >= $1
              AND p.delivery_date < $2
              AND ($3::bigint IS NULL OR p.store_id = $3)
            GROUP BY s.id, s.name, ym
            ORDER BY s.id, ym
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;

        let mut rows: Vec<SupplierPurchaseRow> = Vec::new();
        for r in raw {
            let ym = parse_ym(&r.ym)?;
            if !months.contains(&ym) {
                continue;
            }
            let idx = match rows.iter().position(|x| x.supplier_id == r.supplier_id) {
                Some(idx) => idx,
                None => {
                    rows.push(SupplierPurchaseRow {
                        supplier_id: r.supplier_id,
                        supplier_name: r.supplier_name.clone(),
                        amount_by_month: zero_filled(months),
                        total_amount: 0,
                    });
                    rows.len() - 1
                }
            };
            let row = &mut rows[idx];
            row.amount_by_month.insert(ym, r.total_amount);
            row.total_amount += r.total_amount;
        }

        let month_totals = column_totals(months, rows.iter().map(|r| &r.amount_by_month));

        Ok(PurchaseReport {
            months: months.to_vec(),
            rows,
            month_totals,
        })
    }

    /// Per-item monthly breakdown for one supplier: amount, quantity and
    /// the month's derived unit price.
    pub async fn supplier_items(
        &self,
        months: &[MonthKey],
        supplier_id: i64,
        store_id: Option<i64>,
    ) -> AppResult<SupplierItemReport> {
        let supplier_name: String = sqlx::query_scalar(
            "SELECT name FROM suppliers WHERE id = $1",
        )
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        let Some((start_date, end_date)) = window_date_range(months) else {
            return Ok(SupplierItemReport {
                supplier_id,
                supplier_name,
                months: Vec::new(),
                rows: Vec::new(),
                month_totals_amount: Vec::new(),
                month_totals_qty: Vec::new(),
            });
        };

        let raw: Vec<ItemMonthRow> = sqlx::query_as(
            r#"
            SELECT
                i.id   AS item_id,
                i.code AS item_code,
                i.name AS item_name,
                TO_CHAR(p.delivery_date, 'YYYY-MM') AS ym,
                COALESCE(SUM(p.quantity), 0)::bigint AS total_qty,
                COALESCE(SUM(p.amount), 0)::bigint   AS total_amount
            FROM purchases p
            JOIN items i ON p.item_id = i.id
            WHERE p.is_deleted = FALSE
              AND p.delivery_date >= $1
              AND p.delivery_date < $2
              AND i.supplier_id = $3
              AND ($4::bigint IS NULL OR p.store_id = $4)
            GROUP BY i.id, i.code, i.name, ym
            ORDER BY i.code, ym
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(supplier_id)
        .bind(store_id)
        .fetch_all(&self.db)
        .await?;

        let mut rows: Vec<ItemPurchaseRow> = Vec::new();
        for r in raw {
            let ym = parse_ym(&r.ym)?;
            if !months.contains(&ym) {
                continue;
            }
            let idx = match rows.iter().position(|x| x.item_id == r.item_id) {
                Some(idx) => idx,
                None => {
                    rows.push(ItemPurchaseRow {
                        item_id: r.item_id,
                        item_code: r.item_code.clone(),
                        item_name: r.item_name.clone(),
                        amount_by_month: zero_filled(months),
                        qty_by_month: zero_filled(months),
                        unit_price_by_month: months
                            .iter()
                            .map(|&m| (m, Decimal::ZERO))
                            .collect(),
                        total_amount: 0,
                        total_qty: 0,
                    });
                    rows.len() - 1
                }
            };
            let row = &mut rows[idx];
            row.amount_by_month.insert(ym, r.total_amount);
            row.qty_by_month.insert(ym, r.total_qty);
            row.total_amount += r.total_amount;
            row.total_qty += r.total_qty;
        }

        // Derived unit price, left unrounded for display-side formatting.
        for row in &mut rows {
            for &ym in months {
                let amount = row.amount_by_month.get(&ym).copied().unwrap_or(0);
                let qty = row.qty_by_month.get(&ym).copied().unwrap_or(0);
                let price = if qty > 0 {
                    Decimal::from(amount) / Decimal::from(qty)
                } else {
                    Decimal::ZERO
                };
                row.unit_price_by_month.insert(ym, price);
            }
        }

        let month_totals_amount =
            column_totals(months, rows.iter().map(|r| &r.amount_by_month));
        let month_totals_qty = column_totals(months, rows.iter().map(|r| &r.qty_by_month));

        Ok(SupplierItemReport {
            supplier_id,
            supplier_name,
            months: months.to_vec(),
            rows,
            month_totals_amount,
            month_totals_qty,
        })
    }

    /// Export report rows as CSV. Rows must serialize to flat records.
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn zero_filled(months: &[MonthKey]) -> BTreeMap<MonthKey, i64> {
    months.iter().map(|&m| (m, 0)).collect()
}

fn column_totals<'a>(
    months: &[MonthKey],
    rows: impl Iterator<Item = &'a BTreeMap<MonthKey, i64>> + Clone,
) -> Vec<i64> {
    months
        .iter()
        .map(|ym| {
            rows.clone()
                .map(|by_month| by_month.get(ym).copied().unwrap_or(0))
                .sum()
        })
        .collect()
}

fn parse_ym(ym: &str) -> AppResult<MonthKey> {
    ym.parse()
        .map_err(|e| AppError::Internal(format!("bad month key from query: {e}")))
}
