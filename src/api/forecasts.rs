//! Forecast feed API handlers.
//!
//! Read-only view over the `forecast_results` table populated by the
//! forecasting batch job. Responds 503 when no database is configured.

use actix_web::http::header::ContentDisposition;
use actix_web::{HttpResponse, get, web};
use tracing::debug;

use crate::db::ForecastStore;
use crate::error::{AppError, AppResult};
use crate::models::forecast::build_forecast_list;
use crate::models::{ForecastListResponse, ForecastQuery, TopSkusQuery, TopSkusResponse};

/// List forecast rows with the dashboard filters applied.
#[utoipa::path(
    get,
    path = "/api/forecasts",
    tag = "Forecasts",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Filtered forecasts", body = ForecastListResponse),
        (status = 503, description = "Forecast store not configured", body = crate::error::ErrorResponse),
    )
)]
#[get("")]
pub async fn list_forecasts(
    store: web::Data<ForecastStore>,
    query: web::Query<ForecastQuery>,
) -> AppResult<HttpResponse> {
    let pool = store.pool()?;
    let query = query.into_inner();
    validate_range(query.start_date, query.end_date)?;

    let rows = pool.list_forecasts(&query).await?;
    debug!("Forecast feed returned {} rows", rows.len());

    Ok(HttpResponse::Ok().json(build_forecast_list(rows)))
}

/// Products with the largest summed forecast.
#[utoipa::path(
    get,
    path = "/api/forecasts/top-skus",
    tag = "Forecasts",
    params(TopSkusQuery),
    responses(
        (status = 200, description = "Top products by total forecast", body = TopSkusResponse),
        (status = 503, description = "Forecast store not configured", body = crate::error::ErrorResponse),
    )
)]
#[get("/top-skus")]
pub async fn top_skus(
    store: web::Data<ForecastStore>,
    query: web::Query<TopSkusQuery>,
) -> AppResult<HttpResponse> {
    let pool = store.pool()?;
    let query = query.into_inner();
    validate_range(query.start_date, query.end_date)?;

    let skus = pool.top_skus(&query).await?;

    Ok(HttpResponse::Ok().json(TopSkusResponse { skus }))
}

/// Download the filtered forecast rows as CSV.
#[utoipa::path(
    get,
    path = "/api/forecasts/download",
    tag = "Forecasts",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Filtered forecasts as CSV", content_type = "text/csv", body = String),
        (status = 503, description = "Forecast store not configured", body = crate::error::ErrorResponse),
    )
)]
#[get("/download")]
pub async fn download_forecasts(
    store: web::Data<ForecastStore>,
    query: web::Query<ForecastQuery>,
) -> AppResult<HttpResponse> {
    let pool = store.pool()?;
    let query = query.into_inner();
    validate_range(query.start_date, query.end_date)?;

    let rows = pool.list_forecasts(&query).await?;
    let body = encode_forecasts(&rows)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition::attachment("filtered_forecast.csv"))
        .body(body))
}

fn validate_range(
    start: Option<chrono::NaiveDate>,
    end: Option<chrono::NaiveDate>,
) -> AppResult<()> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(AppError::InvalidInput(format!(
            "start_date {} is after end_date {}",
            start, end
        )));
    }
    Ok(())
}

fn encode_forecasts(rows: &[crate::entity::forecast_result::Model]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["store_id", "product_id", "date", "forecast_qty", "model"])?;
    for row in rows {
        let date = row.date.to_string();
        let qty = row.forecast_qty.to_string();
        writer.write_record([
            row.store_id.as_str(),
            row.product_id.as_str(),
            date.as_str(),
            qty.as_str(),
            row.model.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to encode forecasts: {}", e)))
}

/// Configure forecast routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/forecasts")
            .service(top_skus)
            .service(download_forecasts)
            .service(list_forecasts),
    );
}
