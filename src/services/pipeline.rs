//! Prediction pipeline: run the model over a validated upload and reduce the
//! per-row output to one summary per SKU.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    Confidence, JobResult, PredictionRow, PredictionSummary, SalesTable, SkuSummary,
};
use crate::services::model::{extract_feature_importance, Forecaster};

/// First magnitude an `f64` cannot carry into `i64` exactly (2^63).
const I64_BOUND: f64 = i64::MAX as f64;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Run the whole pipeline for one upload.
pub fn run(model: &dyn Forecaster, table: &SalesTable, job_id: &str) -> AppResult<JobResult> {
    info!("[{}] Running model.predict()...", job_id);
    let rows = predict_rows(model, table)?;
    info!("[{}] Predictions generated: {} values", job_id, rows.len());

    let groups = group_by_sku(rows, table.has_date_column());

    let mut summaries: Vec<SkuSummary> = groups.iter().map(|g| summarize_group(g)).collect();
    // Stable: equal predictions keep first-appearance order.
    summaries.sort_by(|a, b| b.pred_qty.cmp(&a.pred_qty));

    let summary = summarize_job(&summaries)?;
    let feature_importances = extract_feature_importance(model);

    info!(
        "[{}] Prediction complete. {} SKUs, total prediction: {}",
        job_id, summary.num_skus, summary.total_pred
    );

    Ok(JobResult {
        summaries,
        summary,
        feature_importances,
    })
}

/// Invoke the model and attach one integer prediction to every input row.
pub fn predict_rows(model: &dyn Forecaster, table: &SalesTable) -> AppResult<Vec<PredictionRow>> {
    let predictions = model
        .predict(table)
        .map_err(|e| AppError::ModelInference(e.to_string()))?;

    if predictions.len() != table.len() {
        return Err(AppError::ModelInference(format!(
            "model returned {} predictions for {} rows",
            predictions.len(),
            table.len()
        )));
    }

    table
        .rows()
        .iter()
        .zip(predictions)
        .enumerate()
        .map(|(i, (row, prediction))| {
            if !prediction.is_finite() {
                return Err(AppError::ModelInference(format!(
                    "model returned a non-finite prediction for row {}",
                    i + 1
                )));
            }
            if prediction.abs() >= I64_BOUND {
                return Err(AppError::ModelInference(format!(
                    "model returned {} for row {}, outside the integer range",
                    prediction,
                    i + 1
                )));
            }
            if row.quantity.abs() >= I64_BOUND {
                return Err(AppError::InvalidValue {
                    column: "quantity".to_string(),
                    row: i + 1,
                    reason: format!("{} is outside the integer range", row.quantity),
                });
            }
            Ok(PredictionRow {
                sku: row.sku.clone(),
                quantity: row.quantity,
                // Integer cast truncates toward zero.
                pred_qty: prediction as i64,
                date: row.date,
            })
        })
        .collect()
}

/// Group rows by SKU in order of first appearance.
///
/// When the upload has a date column each group is sorted by date, with
/// undated rows last; otherwise upload order is kept.
pub fn group_by_sku(rows: Vec<PredictionRow>, sort_by_date: bool) -> Vec<Vec<PredictionRow>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<PredictionRow>> = Vec::new();

    for row in rows {
        match index.get(&row.sku) {
            Some(&i) => groups[i].push(row),
            None => {
                index.insert(row.sku.clone(), groups.len());
                groups.push(vec![row]);
            }
        }
    }

    if sort_by_date {
        for group in &mut groups {
            group.sort_by(|a, b| match (a.date, b.date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }
    }

    groups
}

/// Last quantity and percent change against the previous observation.
pub fn compute_trend(group: &[PredictionRow]) -> (f64, f64) {
    match group {
        [] => (0.0, 0.0),
        [only] => (only.quantity, 0.0),
        [.., prev, last] => {
            let pct_change = if prev.quantity == 0.0 {
                0.0
            } else {
                (last.quantity - prev.quantity) / prev.quantity * 100.0
            };
            (last.quantity, round2(pct_change))
        }
    }
}

/// Reduce one (sorted) SKU group to its summary row.
pub fn summarize_group(group: &[PredictionRow]) -> SkuSummary {
    let (last_qty, pct_change) = compute_trend(group);
    let last = group.last();

    SkuSummary {
        sku: last.map(|r| r.sku.clone()).unwrap_or_default(),
        last_month_qty: last_qty as i64,
        pred_qty: last.map(|r| r.pred_qty).unwrap_or(0),
        pct_change,
        confidence: Confidence::from_data_points(group.len()),
        data_points: group.len(),
    }
}

/// Totals across all SKU summaries. Fails rather than wrap when the total
/// leaves the `i64` range.
pub fn summarize_job(summaries: &[SkuSummary]) -> AppResult<PredictionSummary> {
    let total_pred = summaries
        .iter()
        .try_fold(0i64, |acc, s| acc.checked_add(s.pred_qty))
        .ok_or_else(|| {
            AppError::ModelInference("total prediction exceeds the integer range".to_string())
        })?;
    let num_skus = summaries.len();
    let mean_pct = if num_skus == 0 {
        0.0
    } else {
        summaries.iter().map(|s| s.pct_change).sum::<f64>() / num_skus as f64
    };

    Ok(PredictionSummary {
        total_pred,
        num_skus,
        pct_change_vs_last_month: round2(mean_pct),
    })
}
