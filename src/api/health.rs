//! Health check endpoints.

use actix_web::{HttpResponse, get, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::ForecastStore;
use crate::services::ModelHandle;

/// Health check response.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// True once a model is serving; the fallback counts.
    pub model_loaded: bool,
    /// `artifact` or `fallback`.
    pub model_source: String,
    /// Whether the forecast feed has a database behind it.
    pub forecast_store: bool,
    pub timestamp: String,
}

/// Health check endpoint.
///
/// Returns 200 if the service is running.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health(
    model: web::Data<ModelHandle>,
    forecasts: web::Data<ForecastStore>,
) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_loaded: true,
        model_source: model.source().as_str().to_string(),
        forecast_store: forecasts.is_enabled(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Configure health routes.
pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
