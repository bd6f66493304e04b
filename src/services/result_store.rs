//! Flat-file storage for raw uploads and per-job result tables.
//!
//! Layout:
//! - `{uploads_dir}/{job_id}.csv`: the upload exactly as received
//! - `{results_dir}/{job_id}_predictions.csv`: the per-SKU result table

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PredictSettings;
use crate::error::{AppError, AppResult};
use crate::models::SkuSummary;

/// Attempts at finding an unused job id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// Length of a generated job id.
const JOB_ID_LEN: usize = 8;

/// Short random identifier of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Draw a fresh id (first 8 hex chars of a v4 UUID).
    pub fn random() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(JOB_ID_LEN);
        JobId(id)
    }

    /// Parse an id taken from a URL. Rejects anything that could escape the
    /// storage directories.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= 64
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| JobId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage for uploads and results.
#[derive(Debug, Clone)]
pub struct ResultStore {
    uploads_dir: PathBuf,
    results_dir: PathBuf,
}

impl ResultStore {
    pub fn new(uploads_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        ResultStore {
            uploads_dir: uploads_dir.into(),
            results_dir: results_dir.into(),
        }
    }

    pub fn from_settings(settings: &PredictSettings) -> Self {
        Self::new(&settings.uploads_dir, &settings.results_dir)
    }

    /// Create both storage directories.
    pub async fn ensure_dirs(&self) -> AppResult<()> {
        for dir in [&self.uploads_dir, &self.results_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::FileSystem(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    pub fn upload_path(&self, job_id: &JobId) -> PathBuf {
        self.uploads_dir.join(format!("{}.csv", job_id))
    }

    pub fn result_path(&self, job_id: &JobId) -> PathBuf {
        self.results_dir.join(format!("{}_predictions.csv", job_id))
    }

    /// Generate a job id not used by any stored upload or result.
    pub async fn allocate_job_id(&self) -> AppResult<JobId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = JobId::random();
            if !exists(&self.upload_path(&candidate)).await
                && !exists(&self.result_path(&candidate)).await
            {
                return Ok(candidate);
            }
            debug!("Job id {} already in use, drawing another", candidate);
        }
        Err(AppError::Internal(
            "Could not allocate a unique job id".to_string(),
        ))
    }

    /// Persist the raw upload.
    pub async fn save_upload(&self, job_id: &JobId, bytes: &[u8]) -> AppResult<PathBuf> {
        let path = self.upload_path(job_id);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::FileSystem(format!("Failed to save upload {}: {}", path.display(), e))
        })?;
        info!("[{}] Raw CSV saved to {}", job_id, path.display());
        Ok(path)
    }

    /// Write the result table for a job, replacing any previous one.
    pub async fn put(&self, job_id: &JobId, summaries: &[SkuSummary]) -> AppResult<PathBuf> {
        let bytes = encode_results(summaries)?;
        let path = self.result_path(job_id);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::FileSystem(format!("Failed to write results {}: {}", path.display(), e))
        })?;
        info!("[{}] Results saved to {}", job_id, path.display());
        Ok(path)
    }

    /// Read back a stored result table.
    pub async fn get(&self, job_id: &str) -> AppResult<Vec<u8>> {
        let job_id = JobId::parse(job_id).ok_or_else(not_found)?;
        let path = self.result_path(&job_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(AppError::FileSystem(format!(
                "Failed to read results {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Results not found".to_string())
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Serialize summaries as CSV with a header row.
pub fn encode_results(summaries: &[SkuSummary]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if summaries.is_empty() {
        writer.write_record([
            "sku",
            "last_month_qty",
            "pred_qty",
            "pct_change",
            "confidence",
            "data_points",
        ])?;
    }
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to encode results: {}", e)))
}
