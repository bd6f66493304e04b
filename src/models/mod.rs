//! Domain models for the predict server.

pub mod forecast;
pub mod prediction;
pub mod sales;

// Re-export commonly used types
pub use forecast::{
    ForecastKpis, ForecastListResponse, ForecastQuery, ForecastRecord, TopSku, TopSkusQuery,
    TopSkusResponse,
};
pub use prediction::{
    Confidence, FeatureImportance, JobResult, PredictionRow, PredictionSummary, SkuSummary,
    UploadPredictResponse,
};
pub use sales::{SalesRow, SalesTable};
