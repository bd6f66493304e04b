//! Model adapter: the trained forecaster behind the upload pipeline.
//!
//! A model is anything implementing [`Forecaster`]. Two implementations ship:
//!
//! - [`ArtifactModel`]: a linear model read from a JSON artifact exported by
//!   the training job.
//! - [`FallbackModel`]: a deterministic stand-in used when no artifact can be
//!   loaded, so the service always starts.
//!
//! The selected model is wrapped in a [`ModelHandle`] once at startup and
//! shared read-only between workers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::models::prediction::MAX_FEATURE_IMPORTANCES;
use crate::models::{FeatureImportance, SalesTable};

/// Quantity multiplier of the fallback model.
const FALLBACK_GROWTH: f64 = 1.2;

/// Prediction of the fallback model when the table has no quantity column.
const FALLBACK_CONSTANT: f64 = 100.0;

/// Importance table reported by the fallback model.
const FALLBACK_IMPORTANCES: &[(&str, f64)] = &[
    ("lag_1", 0.35),
    ("lag_2", 0.20),
    ("lag_3", 0.15),
    ("sku_encoding", 0.12),
    ("day_of_month", 0.10),
    ("seasonality", 0.08),
];

/// Errors raised by a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("feature column '{0}' is missing from the upload")]
    MissingFeature(String),

    #[error("feature column '{column}' has non-numeric value '{value}' at row {row}")]
    NonNumericFeature {
        column: String,
        row: usize,
        value: String,
    },

    #[error("invalid feature importance for '{0}': expected a number")]
    InvalidImportance(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while loading an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model artifact has no coefficients")]
    Empty,
}

/// Feature importances as exposed by a model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawImportances {
    /// Positional weights, named `feature_0`, `feature_1`, ...
    Positional(Vec<Value>),
    /// Name to weight, in the order the model reports them.
    Named(Map<String, Value>),
}

/// A trained forecaster.
pub trait Forecaster: Send + Sync {
    /// One prediction per table row, in row order.
    fn predict(&self, table: &SalesTable) -> Result<Vec<f64>, ModelError>;

    /// Importance weights, if the model exposes any.
    fn feature_importances(&self) -> Option<RawImportances> {
        None
    }
}

/// Deterministic stand-in: `round(quantity * 1.2)` per row.
#[derive(Debug, Default, Clone)]
pub struct FallbackModel;

impl Forecaster for FallbackModel {
    fn predict(&self, table: &SalesTable) -> Result<Vec<f64>, ModelError> {
        if !table.has_column("quantity") {
            return Ok(vec![FALLBACK_CONSTANT; table.len()]);
        }
        Ok(table
            .rows()
            .iter()
            .map(|r| (r.quantity * FALLBACK_GROWTH).round())
            .collect())
    }

    fn feature_importances(&self) -> Option<RawImportances> {
        let map = FALLBACK_IMPORTANCES
            .iter()
            .map(|(name, weight)| (name.to_string(), Value::from(*weight)))
            .collect();
        Some(RawImportances::Named(map))
    }
}

/// Linear model exported by the training job.
///
/// ```json
/// {
///   "intercept": 2.5,
///   "coefficients": {"quantity": 1.1, "promo": 4.0},
///   "feature_importances": {"quantity": 0.8, "promo": 0.2},
///   "clip_negative": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactModel {
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: Map<String, Value>,
    #[serde(default)]
    pub feature_importances: Option<RawImportances>,
    #[serde(default)]
    pub clip_negative: bool,
}

impl ArtifactModel {
    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelLoadError> {
        let model: ArtifactModel = serde_json::from_slice(bytes)?;
        if model.coefficients.is_empty() {
            return Err(ModelLoadError::Empty);
        }
        Ok(model)
    }
}

impl Forecaster for ArtifactModel {
    fn predict(&self, table: &SalesTable) -> Result<Vec<f64>, ModelError> {
        let mut terms = Vec::with_capacity(self.coefficients.len());
        for (column, weight) in &self.coefficients {
            let weight = weight
                .as_f64()
                .ok_or_else(|| ModelError::Other(format!("coefficient '{}' is not a number", column)))?;
            let index = table
                .column_index(&column.to_lowercase())
                .ok_or_else(|| ModelError::MissingFeature(column.clone()))?;
            terms.push((column, index, weight));
        }

        let mut predictions = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let mut value = self.intercept;
            for (column, index, weight) in &terms {
                let cell = table.cell(row, *index).trim();
                let x = cell.parse::<f64>().map_err(|_| ModelError::NonNumericFeature {
                    column: column.to_string(),
                    row: row + 1,
                    value: cell.to_string(),
                })?;
                value += weight * x;
            }
            if self.clip_negative && value < 0.0 {
                value = 0.0;
            }
            predictions.push(value);
        }

        Ok(predictions)
    }

    fn feature_importances(&self) -> Option<RawImportances> {
        self.feature_importances.clone()
    }
}

/// Where the serving model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Artifact,
    Fallback,
}

impl ModelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Artifact => "artifact",
            Self::Fallback => "fallback",
        }
    }
}

/// The model selected at startup; immutable afterwards.
#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<dyn Forecaster>,
    source: ModelSource,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .finish()
    }
}

impl ModelHandle {
    pub fn new(model: Arc<dyn Forecaster>, source: ModelSource) -> Self {
        ModelHandle { model, source }
    }

    pub fn fallback() -> Self {
        Self::new(Arc::new(FallbackModel), ModelSource::Fallback)
    }

    /// Load the artifact at `path`, substituting the fallback on any failure.
    pub fn load(path: &Path) -> Self {
        match ArtifactModel::load(path) {
            Ok(model) => {
                info!("Model loaded successfully from {}", path.display());
                Self::new(Arc::new(model), ModelSource::Artifact)
            }
            Err(ModelLoadError::NotFound(p)) => {
                warn!("Model file not found at {}. Using fallback model.", p.display());
                Self::fallback()
            }
            Err(e) => {
                error!("Failed to load model from {}: {}", path.display(), e);
                Self::fallback()
            }
        }
    }

    pub fn source(&self) -> ModelSource {
        self.source
    }

    /// True when a trained artifact (not the fallback) is serving.
    pub fn is_artifact_loaded(&self) -> bool {
        self.source == ModelSource::Artifact
    }

    pub fn forecaster(&self) -> &dyn Forecaster {
        self.model.as_ref()
    }
}

/// Normalize a model's importances into the top entries, heaviest first.
///
/// Never fails: a model without importances, or with malformed ones, yields
/// an empty list.
pub fn extract_feature_importance(model: &dyn Forecaster) -> Vec<FeatureImportance> {
    let Some(raw) = model.feature_importances() else {
        warn!("Model does not expose feature importances.");
        return Vec::new();
    };

    match normalize_importances(raw) {
        Ok(items) => items,
        Err(e) => {
            error!("Error extracting feature importance: {}", e);
            Vec::new()
        }
    }
}

fn normalize_importances(raw: RawImportances) -> Result<Vec<FeatureImportance>, ModelError> {
    let pairs: Vec<(String, Value)> = match raw {
        RawImportances::Named(map) => map.into_iter().collect(),
        RawImportances::Positional(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("feature_{}", i), v))
            .collect(),
    };

    let mut items = pairs
        .into_iter()
        .map(|(feature, value)| match value.as_f64() {
            Some(importance) if importance.is_finite() => Ok(FeatureImportance {
                feature,
                importance,
            }),
            _ => Err(ModelError::InvalidImportance(feature)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Stable: ties keep the model's order.
    items.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    items.truncate(MAX_FEATURE_IMPORTANCES);
    Ok(items)
}
