//! Forecast feed DTOs (read-only view over `forecast_results`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::forecast_result;

fn default_limit() -> u64 {
    1000
}

fn default_top_limit() -> usize {
    10
}

/// Filters accepted by the forecast feed.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    pub store_id: Option<String>,
    pub product_id: Option<String>,
    /// Inclusive lower bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub end_date: Option<NaiveDate>,
    /// Maximum rows returned (default: 1000, max: 10000).
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        ForecastQuery {
            store_id: None,
            product_id: None,
            start_date: None,
            end_date: None,
            limit: default_limit(),
        }
    }
}

impl ForecastQuery {
    pub fn clamped_limit(&self) -> u64 {
        self.limit.clamp(1, 10_000)
    }
}

/// Query for the top-SKU ranking.
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopSkusQuery {
    pub store_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Number of SKUs to return (default: 10, max: 100).
    #[serde(default = "default_top_limit")]
    pub limit: usize,
}

impl TopSkusQuery {
    pub fn clamped_limit(&self) -> u64 {
        self.limit.clamp(1, 100) as u64
    }
}

/// One forecast row as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastRecord {
    pub store_id: String,
    pub product_id: String,
    pub date: NaiveDate,
    pub forecast_qty: f64,
    pub model: String,
    /// True when the quantity is above the mean of the returned rows.
    pub above_mean: bool,
}

/// Aggregate metrics over the returned rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ForecastKpis {
    pub total_forecast_qty: f64,
    pub average_forecast_qty: f64,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForecastListResponse {
    pub records: Vec<ForecastRecord>,
    pub kpis: ForecastKpis,
}

/// Summed forecast for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopSku {
    pub product_id: String,
    pub forecast_qty: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TopSkusResponse {
    pub skus: Vec<TopSku>,
}

impl ForecastKpis {
    pub fn from_models(rows: &[forecast_result::Model]) -> Self {
        let total: f64 = rows.iter().map(|r| r.forecast_qty).sum();
        let count = rows.len();
        let average = if count == 0 { 0.0 } else { total / count as f64 };
        ForecastKpis {
            total_forecast_qty: total,
            average_forecast_qty: (average * 100.0).round() / 100.0,
            count,
        }
    }
}

/// Build the list response, flagging rows above the mean quantity.
pub fn build_forecast_list(rows: Vec<forecast_result::Model>) -> ForecastListResponse {
    let kpis = ForecastKpis::from_models(&rows);
    let mean = if rows.is_empty() {
        0.0
    } else {
        kpis.total_forecast_qty / rows.len() as f64
    };

    let records = rows
        .into_iter()
        .map(|r| ForecastRecord {
            above_mean: r.forecast_qty > mean,
            store_id: r.store_id,
            product_id: r.product_id,
            date: r.date,
            forecast_qty: r.forecast_qty,
            model: r.model,
        })
        .collect();

    ForecastListResponse { records, kpis }
}
