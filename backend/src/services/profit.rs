//! Profit estimate service
//!
//! Looks up the ratio configuration applying to a store and month and
//! applies it to a COGS figure. Setting selection is priority-ordered,
//! not a join: a store-specific setting beats a global one, then the
//! latest `effective_from` on or before the month start wins.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use shared::period::MonthKey;
use shared::profit::{self, ProfitEstimate, ProfitSetting};

use crate::error::AppResult;

/// Profit estimate service
#[derive(Clone)]
pub struct ProfitService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SettingRow {
    store_id: Option<i64>,
    effective_from: chrono::NaiveDate,
    fl_ratio: Decimal,
    food_ratio: Decimal,
    utility_ratio: Decimal,
    fixed_cost_yen: i64,
}

impl ProfitService {
    /// Create a new ProfitService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The setting in effect for a store at the start of a month, if any.
    /// Most specific, most recent wins.
    pub async fn setting_for(
        &self,
        store_id: i64,
        month: MonthKey,
    ) -> AppResult<Option<ProfitSetting>> {
        let month_start = month.first_day();

        let row: Option<SettingRow> = sqlx::query_as(
            r#"
            SELECT
                store_id,
                effective_from,
                fl_ratio,
                food_ratio,
                utility_ratio,
                fixed_cost_yen
            FROM profit_settings
            WHERE (store_id = $1 OR store_id IS NULL)
              AND effective_from <= $2
              AND (effective_to IS NULL OR effective_to >= $2)
            ORDER BY
                (store_id IS NOT NULL) DESC,
                effective_from DESC
            LIMIT 1
            "#,
        )
        .bind(store_id)
        .bind(month_start)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|r| ProfitSetting {
            store_id: r.store_id,
            effective_from: r.effective_from,
            fl_ratio: r.fl_ratio,
            food_ratio: r.food_ratio,
            utility_ratio: r.utility_ratio,
            fixed_cost_yen: r.fixed_cost_yen,
        }))
    }

    /// Estimate the month's profit from its COGS. `None` when no setting
    /// applies, the month had no COGS, or the food ratio is zero — an
    /// absent estimate, never an error.
    pub async fn estimate_for(
        &self,
        store_id: i64,
        month: MonthKey,
        cogs_yen: i64,
    ) -> AppResult<Option<ProfitEstimate>> {
        let Some(setting) = self.setting_for(store_id, month).await? else {
            return Ok(None);
        };
        Ok(profit::estimate(cogs_yen, &setting))
    }
}
