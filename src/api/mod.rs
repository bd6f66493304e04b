//! API endpoint modules.

pub mod forecasts;
pub mod health;
pub mod openapi;
pub mod predict;

pub use forecasts::configure_routes as configure_forecast_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use predict::configure_routes as configure_predict_routes;
