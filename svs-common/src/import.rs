//! Bulk import of serial ranges and invalid serials
//!
//! The spreadsheet reader is external. Its output arrives as a [`Workbook`]
//! of untyped [`Sheet`]s; this module turns those into typed
//! [`RawRangeRow`]/[`RawInvalidRow`] records, validates and normalizes them,
//! persists the resulting [`RangeTable`] and publishes it.
//!
//! Failure policy:
//! - missing sheet or required column: nothing is published, the result
//!   carries a single structural issue
//! - bad row: excluded and reported, the rest of the batch continues
//! - unreadable source or storage failure: `Err`, nothing is published
//! - a second import while one is running: [`Error::ImportInProgress`]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::normalize::{Identifier, Normalizer};
use crate::range_table::{RangeTable, SerialRange};
use crate::snapshot::SnapshotCell;
use crate::store::SerialStore;
use crate::{Error, Result};

pub const REFERENCE_COLUMN: &str = "Reference Number";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const START_SERIAL_COLUMN: &str = "Start Serial";
pub const END_SERIAL_COLUMN: &str = "End Serial";
pub const DATE_COLUMN: &str = "Date";
pub const FAILED_SERIAL_COLUMN: &str = "Failed Serial";

/// Required columns of the ranges sheet, matched case-sensitively
pub const RANGE_COLUMNS: [&str; 5] = [
    REFERENCE_COLUMN,
    DESCRIPTION_COLUMN,
    START_SERIAL_COLUMN,
    END_SERIAL_COLUMN,
    DATE_COLUMN,
];

/// Spreadsheet cell as delivered by the reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Cell {
    /// Text form of the cell, `None` if blank
    ///
    /// Integral numbers render without a fractional part, so a serial typed as
    /// a number in the spreadsheet reads the same as one typed as text.
    pub fn render(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_string()
                } else if let Some(u) = n.as_u64() {
                    u.to_string()
                } else {
                    // positional notation only; an exponent would read as letters
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 => format!("{:.0}", f),
                        Some(f) => format!("{}", f),
                        None => n.to_string(),
                    }
                }
            }
            Cell::Text(s) => s.trim().to_string(),
        };

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// One sheet: header row plus data rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub name: String,
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Required columns absent from the header row
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect()
    }

    fn label(&self, fallback: &str) -> String {
        if self.name.is_empty() {
            fallback.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Data rows with their 1-based spreadsheet row numbers, blank rows skipped
    fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|c| c.render().is_some()))
            .map(|(i, row)| (i + 2, row.as_slice()))
    }

    fn require(&self, fallback: &str, required: &[&str]) -> Result<Vec<usize>> {
        let missing = self.missing_columns(required);
        if !missing.is_empty() {
            return Err(Error::StructuralImport {
                sheet: self.label(fallback),
                missing,
            });
        }
        Ok(required
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect())
    }
}

fn cell_at(row: &[Cell], index: usize) -> Option<String> {
    row.get(index).and_then(Cell::render)
}

/// Workbook as produced by the external spreadsheet reader
///
/// Sheet 1 holds ranges, sheet 2 the invalid list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read a workbook serialized as JSON
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Source {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Self::from_json_str(&contents).map_err(|e| Error::Source {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// A bad row excluded from the import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub sheet: String,
    /// Spreadsheet row number, header row = 1
    pub row: usize,
    pub column: String,
    pub value: Option<String>,
    pub reason: String,
}

/// Problem reported by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportIssue {
    /// Missing sheet or column; nothing was published
    Structural { sheet: String, missing: Vec<String> },
    /// Single row excluded; the rest was published
    Row(RowError),
}

/// Outcome of an import attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub published: bool,
    /// Version of the published table
    pub version: Option<u64>,
    pub range_count: usize,
    pub invalid_count: usize,
    pub errors: Vec<ImportIssue>,
}

impl ImportResult {
    pub fn structural(sheet: String, missing: Vec<String>) -> Self {
        Self {
            published: false,
            version: None,
            range_count: 0,
            invalid_count: 0,
            errors: vec![ImportIssue::Structural { sheet, missing }],
        }
    }

    pub fn is_structural_failure(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, ImportIssue::Structural { .. }))
    }

    pub fn row_errors(&self) -> impl Iterator<Item = &RowError> {
        self.errors.iter().filter_map(|e| match e {
            ImportIssue::Row(row) => Some(row),
            ImportIssue::Structural { .. } => None,
        })
    }
}

/// Ranges-sheet row before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRangeRow {
    pub row: usize,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub start_serial: Option<String>,
    pub end_serial: Option<String>,
    pub date: Option<String>,
}

impl RawRangeRow {
    /// Extract typed rows; fails structurally when a required column is absent
    pub fn from_sheet(sheet: &Sheet) -> Result<Vec<Self>> {
        let columns = sheet.require("sheet 1", &RANGE_COLUMNS)?;
        let (reference, description, start, end, date) =
            (columns[0], columns[1], columns[2], columns[3], columns[4]);

        Ok(sheet
            .data_rows()
            .map(|(row, cells)| Self {
                row,
                reference: cell_at(cells, reference),
                description: cell_at(cells, description),
                start_serial: cell_at(cells, start),
                end_serial: cell_at(cells, end),
                date: cell_at(cells, date),
            })
            .collect())
    }

    /// Validate and normalize into a [`SerialRange`]
    pub fn validate(self, sheet: &str, normalizer: &Normalizer) -> std::result::Result<SerialRange, RowError> {
        let row = self.row;
        let error = |column: &str, value: Option<&String>, reason: String| RowError {
            sheet: sheet.to_string(),
            row,
            column: column.to_string(),
            value: value.cloned(),
            reason,
        };

        let reference = self
            .reference
            .ok_or_else(|| error(REFERENCE_COLUMN, None, "blank".to_string()))?;
        let description = self
            .description
            .ok_or_else(|| error(DESCRIPTION_COLUMN, None, "blank".to_string()))?;
        let raw_start = self
            .start_serial
            .ok_or_else(|| error(START_SERIAL_COLUMN, None, "blank".to_string()))?;
        let raw_end = self
            .end_serial
            .ok_or_else(|| error(END_SERIAL_COLUMN, None, "blank".to_string()))?;
        let raw_date = self
            .date
            .ok_or_else(|| error(DATE_COLUMN, None, "blank".to_string()))?;

        let start = normalizer
            .normalize(&raw_start)
            .map_err(|e| error(START_SERIAL_COLUMN, Some(&raw_start), e.to_string()))?;
        let end = normalizer
            .normalize(&raw_end)
            .map_err(|e| error(END_SERIAL_COLUMN, Some(&raw_end), e.to_string()))?;
        let date = parse_date(&raw_date)
            .ok_or_else(|| error(DATE_COLUMN, Some(&raw_date), "unrecognized date".to_string()))?;

        if start > end {
            return Err(error(
                END_SERIAL_COLUMN,
                Some(&raw_end),
                format!("range end {} precedes start {}", end, start),
            ));
        }

        Ok(SerialRange {
            reference,
            description,
            start,
            end,
            date,
        })
    }
}

/// Invalid-list row before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInvalidRow {
    pub row: usize,
    pub failed_serial: Option<String>,
}

impl RawInvalidRow {
    pub fn from_sheet(sheet: &Sheet) -> Result<Vec<Self>> {
        let columns = sheet.require("sheet 2", &[FAILED_SERIAL_COLUMN])?;
        let failed = columns[0];

        Ok(sheet
            .data_rows()
            .map(|(row, cells)| Self {
                row,
                failed_serial: cell_at(cells, failed),
            })
            .collect())
    }

    pub fn validate(self, sheet: &str, normalizer: &Normalizer) -> std::result::Result<Identifier, RowError> {
        let error = |value: Option<String>, reason: String| RowError {
            sheet: sheet.to_string(),
            row: self.row,
            column: FAILED_SERIAL_COLUMN.to_string(),
            value,
            reason,
        };

        let raw = match &self.failed_serial {
            Some(raw) => raw,
            None => return Err(error(None, "blank".to_string())),
        };
        normalizer
            .normalize(raw)
            .map_err(|e| error(Some(raw.clone()), e.to_string()))
    }
}

/// Accepts `YYYY-MM-DD` / `YYYY/MM/DD` with an optional time part, or an
/// Excel day serial
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split(|c: char| c == ' ' || c == 'T').next()?;

    if !date_part.is_empty() && date_part.len() <= 7 && date_part.chars().all(|c| c.is_ascii_digit()) {
        let days: i64 = date_part.parse().ok()?;
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return epoch.checked_add_signed(chrono::Duration::days(days));
    }

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .ok()
}

/// Sole writer of the published range table
pub struct ImportPipeline {
    normalizer: Arc<Normalizer>,
    snapshot: SnapshotCell,
    store: Arc<dyn SerialStore>,
    slot: Mutex<()>,
}

impl ImportPipeline {
    pub fn new(normalizer: Arc<Normalizer>, snapshot: SnapshotCell, store: Arc<dyn SerialStore>) -> Self {
        Self {
            normalizer,
            snapshot,
            store,
            slot: Mutex::new(()),
        }
    }

    /// Import a workbook file written by the spreadsheet reader
    pub async fn import_file(&self, path: &Path) -> Result<ImportResult> {
        let workbook = Workbook::from_json_file(path).await?;
        self.import_workbook(&workbook).await
    }

    pub async fn import_workbook(&self, workbook: &Workbook) -> Result<ImportResult> {
        let empty = Sheet::default();
        let ranges = workbook.sheets.first();
        let invalids = workbook.sheets.get(1);

        match (ranges, invalids) {
            (Some(ranges), Some(invalids)) => self.import(ranges, invalids).await,
            (Some(_), None) => {
                let _slot = self.slot.try_lock().map_err(|_| Error::ImportInProgress)?;
                warn!("Import rejected: workbook has no invalid-serial sheet");
                Ok(ImportResult::structural(
                    "sheet 2".to_string(),
                    vec![FAILED_SERIAL_COLUMN.to_string()],
                ))
            }
            (None, _) => self.import(&empty, &empty).await,
        }
    }

    /// Validate both sheets and publish a new table
    ///
    /// The published snapshot changes only after the store has committed the
    /// new table; every failure path leaves the previous one in place.
    pub async fn import(&self, ranges: &Sheet, invalids: &Sheet) -> Result<ImportResult> {
        let _slot = self.slot.try_lock().map_err(|_| {
            warn!("Import rejected: another import is in progress");
            Error::ImportInProgress
        })?;

        let (range_rows, invalid_rows) =
            match (RawRangeRow::from_sheet(ranges), RawInvalidRow::from_sheet(invalids)) {
                (Ok(r), Ok(i)) => (r, i),
                (Err(Error::StructuralImport { sheet, missing }), _)
                | (_, Err(Error::StructuralImport { sheet, missing })) => {
                    warn!(sheet = %sheet, missing = ?missing, "Import rejected: missing required columns");
                    return Ok(ImportResult::structural(sheet, missing));
                }
                (Err(e), _) | (_, Err(e)) => return Err(e),
            };

        let ranges_label = ranges.label("sheet 1");
        let invalids_label = invalids.label("sheet 2");
        let mut errors = Vec::new();

        let mut accepted = Vec::with_capacity(range_rows.len());
        for raw in range_rows {
            match raw.validate(&ranges_label, &self.normalizer) {
                Ok(range) => accepted.push(range),
                Err(row_error) => {
                    warn!(
                        sheet = %row_error.sheet,
                        row = row_error.row,
                        column = %row_error.column,
                        reason = %row_error.reason,
                        "Range row excluded"
                    );
                    errors.push(ImportIssue::Row(row_error));
                }
            }
        }

        let mut invalid_set = HashSet::with_capacity(invalid_rows.len());
        for raw in invalid_rows {
            match raw.validate(&invalids_label, &self.normalizer) {
                Ok(id) => {
                    invalid_set.insert(id);
                }
                Err(row_error) => {
                    warn!(
                        sheet = %row_error.sheet,
                        row = row_error.row,
                        reason = %row_error.reason,
                        "Invalid-serial row excluded"
                    );
                    errors.push(ImportIssue::Row(row_error));
                }
            }
        }

        let version = self.snapshot.version() + 1;
        let table = match RangeTable::build(accepted, invalid_set, version) {
            Ok(table) => table,
            Err(Error::StructuralImport { sheet, missing }) => {
                return Ok(ImportResult::structural(sheet, missing));
            }
            Err(e) => return Err(e),
        };

        self.store.replace_table(&table).await.map_err(|e| {
            tracing::error!(error = %e, "Import aborted: failed to persist range table");
            match e {
                Error::Storage(_) => e,
                other => Error::Storage(other.to_string()),
            }
        })?;

        let result = ImportResult {
            published: true,
            version: Some(version),
            range_count: table.range_count(),
            invalid_count: table.invalid_count(),
            errors,
        };

        self.snapshot.publish(table);

        info!(
            version,
            ranges = result.range_count,
            invalids = result.invalid_count,
            row_errors = result.errors.len(),
            "Published new range table"
        );

        Ok(result)
    }
}
