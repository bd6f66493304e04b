//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sales Forecast Predict Server",
        version = "0.1.0",
        description = "Upload sales history as CSV, get per-SKU forecasts back, and browse stored forecast results"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        // Predict endpoints
        api::predict::upload_and_predict,
        api::predict::download_results,
        api::predict::template_csv,
        // Forecast feed endpoints
        api::forecasts::list_forecasts,
        api::forecasts::top_skus,
        api::forecasts::download_forecasts,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            // Predict
            models::Confidence,
            models::SkuSummary,
            models::PredictionSummary,
            models::FeatureImportance,
            models::UploadPredictResponse,
            // Forecasts
            models::ForecastRecord,
            models::ForecastKpis,
            models::ForecastListResponse,
            models::TopSku,
            models::TopSkusResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Predict", description = "Upload sales history and download predictions"),
        (name = "Forecasts", description = "Read-only view of stored forecast results")
    )
)]
pub struct ApiDoc;
