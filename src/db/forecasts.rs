//! Database queries for the forecast feed.

use sea_orm::{
    ColumnTrait, DatabaseBackend, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select, Statement, Value,
};

use crate::entity::forecast_result::{self as forecast, Entity as ForecastResult};
use crate::error::{AppError, AppResult};
use crate::models::{ForecastQuery, TopSku, TopSkusQuery};

use super::DbPool;

fn apply_common_filters(
    mut select: Select<ForecastResult>,
    store_id: Option<&str>,
    start_date: Option<chrono::NaiveDate>,
    end_date: Option<chrono::NaiveDate>,
) -> Select<ForecastResult> {
    if let Some(store_id) = store_id {
        select = select.filter(forecast::Column::StoreId.eq(store_id));
    }
    if let Some(start) = start_date {
        select = select.filter(forecast::Column::Date.gte(start));
    }
    if let Some(end) = end_date {
        select = select.filter(forecast::Column::Date.lte(end));
    }
    select
}

/// Per-product total as returned by the ranking query.
#[derive(Debug, FromQueryResult)]
struct ProductTotal {
    product_id: String,
    forecast_qty: f64,
}

/// Build the ranking query: sum per product over the whole filtered table,
/// largest first, ties broken by product id.
pub(crate) fn top_skus_statement(query: &TopSkusQuery) -> Statement {
    let mut conditions = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ref store_id) = query.store_id {
        values.push(store_id.clone().into());
        conditions.push(format!("store_id = ${}", values.len()));
    }
    if let Some(start) = query.start_date {
        values.push(start.into());
        conditions.push(format!("date >= ${}", values.len()));
    }
    if let Some(end) = query.end_date {
        values.push(end.into());
        conditions.push(format!("date <= ${}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    values.push((query.clamped_limit() as i64).into());
    let sql = format!(
        r#"
        SELECT product_id, SUM(forecast_qty)::DOUBLE PRECISION AS forecast_qty
        FROM forecast_results
        {}
        GROUP BY product_id
        ORDER BY forecast_qty DESC, product_id ASC
        LIMIT ${}
        "#,
        where_clause,
        values.len()
    );

    Statement::from_sql_and_values(DatabaseBackend::Postgres, &sql, values)
}

impl DbPool {
    /// List forecast rows ordered by date.
    pub async fn list_forecasts(&self, query: &ForecastQuery) -> AppResult<Vec<forecast::Model>> {
        let mut select = apply_common_filters(
            ForecastResult::find(),
            query.store_id.as_deref(),
            query.start_date,
            query.end_date,
        );

        if let Some(ref product_id) = query.product_id {
            select = select.filter(forecast::Column::ProductId.eq(product_id.as_str()));
        }

        let rows = select
            .order_by_asc(forecast::Column::Date)
            .order_by_asc(forecast::Column::StoreId)
            .order_by_asc(forecast::Column::ProductId)
            .limit(query.clamped_limit())
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list forecasts: {}", e)))?;

        Ok(rows)
    }

    /// Products with the largest summed forecast, aggregated in the database.
    pub async fn top_skus(&self, query: &TopSkusQuery) -> AppResult<Vec<TopSku>> {
        let rows = ProductTotal::find_by_statement(top_skus_statement(query))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to rank products: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| TopSku {
                product_id: r.product_id,
                forecast_qty: r.forecast_qty,
            })
            .collect())
    }
}
