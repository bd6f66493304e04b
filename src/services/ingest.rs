//! Upload ingestion: size limits, raw persistence, CSV parsing and the
//! required-column contract.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::sales::{parse_date, DATE_COLUMN, REQUIRED_COLUMNS};
use crate::models::{SalesRow, SalesTable};
use crate::services::result_store::{JobId, ResultStore};

/// A validated upload ready for prediction.
#[derive(Debug)]
pub struct IngestedUpload {
    pub job_id: JobId,
    pub raw_path: PathBuf,
    pub table: SalesTable,
}

/// Room for multipart boundaries and part headers on top of the file itself.
pub const MULTIPART_FRAMING_ALLOWANCE: usize = 64 * 1024;

/// Reject a request whose declared length cannot fit a file under the
/// ceiling, before any of the body is read. The exact file size is checked
/// while streaming.
pub fn check_declared_size(declared: Option<usize>, max_upload_size: usize) -> AppResult<()> {
    let request_ceiling = max_upload_size.saturating_add(MULTIPART_FRAMING_ALLOWANCE);
    match declared {
        Some(size) if size > request_ceiling => {
            tracing::error!("File too large: {} bytes", size);
            Err(AppError::PayloadTooLarge(max_upload_size))
        }
        _ => Ok(()),
    }
}

/// Persist the raw bytes under a new job id, then parse and validate them.
///
/// The raw file is written before parsing so a rejected upload can still be
/// inspected afterwards.
pub async fn ingest(store: &ResultStore, bytes: Vec<u8>) -> AppResult<IngestedUpload> {
    if bytes.is_empty() {
        return Err(AppError::EmptyPayload);
    }

    let job_id = store.allocate_job_id().await?;
    let raw_path = store.save_upload(&job_id, &bytes).await?;

    let table = tokio::task::spawn_blocking(move || parse_sales_csv(&bytes)).await??;

    info!(
        "[{}] CSV parsed: {} rows, columns: {:?}",
        job_id,
        table.len(),
        table.columns()
    );

    Ok(IngestedUpload {
        job_id,
        raw_path,
        table,
    })
}

/// Parse CSV bytes into a [`SalesTable`] with lowercase column names.
pub fn parse_sales_csv(bytes: &[u8]) -> AppResult<SalesTable> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        cells.push(record.iter().map(str::to_string).collect());
    }

    if cells.is_empty() {
        return Err(AppError::EmptyTable);
    }

    let columns = normalize_columns(&headers)?;
    let rows = extract_rows(&columns, &cells)?;

    Ok(SalesTable::new(columns, cells, rows))
}

/// Check the required columns case-insensitively and lowercase all names.
pub fn normalize_columns(headers: &[String]) -> AppResult<Vec<String>> {
    let lower_to_original: HashMap<String, &String> =
        headers.iter().map(|h| (h.to_lowercase(), h)).collect();

    for required in REQUIRED_COLUMNS {
        if !lower_to_original.contains_key(*required) {
            return Err(AppError::MissingColumn {
                column: required.to_string(),
                found: headers.to_vec(),
            });
        }
    }

    Ok(headers.iter().map(|h| h.to_lowercase()).collect())
}

fn extract_rows(columns: &[String], cells: &[Vec<String>]) -> AppResult<Vec<SalesRow>> {
    let position = |name: &str| columns.iter().position(|c| c == name);
    // Required columns were checked by `normalize_columns`.
    let (Some(sku_idx), Some(qty_idx)) = (position("sku"), position("quantity")) else {
        return Err(AppError::Internal("required columns vanished".to_string()));
    };
    let date_idx = position(DATE_COLUMN);

    cells
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            let raw = |idx: usize| record.get(idx).map(String::as_str).unwrap_or("");
            let cell = |idx: usize| raw(idx).trim();

            // SKUs are kept byte-for-byte: "A" and "A " are distinct products.
            let sku = raw(sku_idx);
            if sku.trim().is_empty() {
                return Err(AppError::InvalidValue {
                    column: "sku".to_string(),
                    row,
                    reason: "value is empty".to_string(),
                });
            }

            let quantity = parse_quantity(cell(qty_idx)).map_err(|reason| AppError::InvalidValue {
                column: "quantity".to_string(),
                row,
                reason,
            })?;

            Ok(SalesRow {
                sku: sku.to_string(),
                quantity,
                date: date_idx.and_then(|idx| parse_date(cell(idx))),
            })
        })
        .collect()
}

fn parse_quantity(value: &str) -> Result<f64, String> {
    if value.is_empty() {
        return Err("value is empty".to_string());
    }
    match value.parse::<f64>() {
        Ok(q) if q.is_finite() && q >= 0.0 => Ok(q),
        Ok(_) => Err(format!("'{}' is not a non-negative number", value)),
        Err(_) => Err(format!("'{}' is not a number", value)),
    }
}
