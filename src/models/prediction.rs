//! Prediction output models: per-row predictions, per-SKU summaries and the
//! job-level result returned by the upload endpoint.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// SKUs with fewer observations than this are reported with low confidence.
pub const HIGH_CONFIDENCE_MIN_POINTS: usize = 6;

/// Maximum number of feature importances reported.
pub const MAX_FEATURE_IMPORTANCES: usize = 10;

/// Number of summary rows included inline in the upload response.
pub const PREVIEW_ROWS: usize = 10;

/// Model output for a single uploaded row.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub sku: String,
    pub quantity: f64,
    /// Model output truncated toward zero.
    pub pred_qty: i64,
    pub date: Option<NaiveDateTime>,
}

/// Coarse confidence label derived from the observation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    High,
}

impl Confidence {
    pub fn from_data_points(data_points: usize) -> Self {
        if data_points < HIGH_CONFIDENCE_MIN_POINTS {
            Confidence::Low
        } else {
            Confidence::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::High => "high",
        }
    }
}

/// One row of the result table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkuSummary {
    pub sku: String,
    /// Most recent observed quantity.
    pub last_month_qty: i64,
    /// Prediction attached to the most recent observation.
    pub pred_qty: i64,
    /// Percent change of the last quantity vs. the one before it.
    pub pct_change: f64,
    pub confidence: Confidence,
    pub data_points: usize,
}

/// Job-level aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionSummary {
    pub total_pred: i64,
    pub num_skus: usize,
    pub pct_change_vs_last_month: f64,
}

/// A model-reported weight for one input feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything the pipeline produces for one upload.
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Sorted by `pred_qty` descending.
    pub summaries: Vec<SkuSummary>,
    pub summary: PredictionSummary,
    pub feature_importances: Vec<FeatureImportance>,
}

impl JobResult {
    pub fn preview(&self) -> &[SkuSummary] {
        let n = self.summaries.len().min(PREVIEW_ROWS);
        &self.summaries[..n]
    }
}

/// Response body of `POST /api/predict/upload`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadPredictResponse {
    pub job_id: String,
    /// Always `completed`; failures are reported through the error body.
    pub status: String,
    pub summary: PredictionSummary,
    /// Top rows of the result table.
    pub preview: Vec<SkuSummary>,
    pub feature_importances: Vec<FeatureImportance>,
    pub download_url: String,
}

impl UploadPredictResponse {
    pub fn completed(job_id: &str, result: JobResult) -> Self {
        let preview = result.preview().to_vec();
        UploadPredictResponse {
            job_id: job_id.to_string(),
            status: "completed".to_string(),
            summary: result.summary,
            preview,
            feature_importances: result.feature_importances,
            download_url: download_url(job_id),
        }
    }
}

/// Public path where a job's result table can be fetched.
pub fn download_url(job_id: &str) -> String {
    format!("/api/predict/download/{}", job_id)
}
