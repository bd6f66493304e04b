//! Uploaded sales history: the validated table handed to the model.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Columns every upload must carry (lowercase).
pub const REQUIRED_COLUMNS: &[&str] = &["sku", "quantity"];

/// Optional column used to order observations within a SKU.
pub const DATE_COLUMN: &str = "date";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// One observation from the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRow {
    pub sku: String,
    pub quantity: f64,
    /// `None` when the upload has no date column or the cell did not parse.
    pub date: Option<NaiveDateTime>,
}

/// A parsed upload with lowercase column names.
///
/// Keeps the raw cells next to the typed rows so a model can read any
/// feature column it was trained on, not just `sku`/`quantity`/`date`.
#[derive(Debug, Clone)]
pub struct SalesTable {
    columns: Vec<String>,
    cells: Vec<Vec<String>>,
    rows: Vec<SalesRow>,
}

impl SalesTable {
    /// Build a table. `columns` must already be lowercase and `cells` must
    /// hold one entry per row in `rows`.
    pub fn new(columns: Vec<String>, cells: Vec<Vec<String>>, rows: Vec<SalesRow>) -> Self {
        debug_assert_eq!(cells.len(), rows.len());
        SalesTable {
            columns,
            cells,
            rows,
        }
    }

    /// Convenience constructor from typed rows (used by tests and tooling).
    pub fn from_rows(rows: Vec<SalesRow>) -> Self {
        let has_date = rows.iter().any(|r| r.date.is_some());
        let mut columns = vec!["sku".to_string(), "quantity".to_string()];
        if has_date {
            columns.insert(0, DATE_COLUMN.to_string());
        }
        let cells = rows
            .iter()
            .map(|r| {
                let mut cells = vec![r.sku.clone(), r.quantity.to_string()];
                if has_date {
                    let date = r
                        .date
                        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    cells.insert(0, date);
                }
                cells
            })
            .collect();
        SalesTable::new(columns, cells, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[SalesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn has_date_column(&self) -> bool {
        self.has_column(DATE_COLUMN)
    }

    /// Raw cell text, empty when the record was short.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse a date cell. Unrecognised values yield `None` rather than an error.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
