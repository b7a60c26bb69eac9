use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use coin_forecast_core::AuxPoint;
use serde::Deserialize;

use crate::repositories::AuxiliaryRepository;

/// One row of a daily reference-index download.
///
/// Columns other than `Date`, `Open` and `Close` are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: Option<f64>,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
}

/// Number of values written by an index import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub rows: usize,
    pub skipped: usize,
    pub open_written: u64,
    pub close_written: u64,
}

pub struct CsvStorage;

impl CsvStorage {
    /// Reads a daily index CSV with header `Date,Open,Close[,...]`.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a row cannot be parsed.
    pub fn read_index(path: &Path) -> Result<Vec<IndexRow>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(file);

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<IndexRow>().enumerate() {
            // header is line 1
            let row = result
                .with_context(|| format!("Invalid row at line {} of {}", line + 2, path.display()))?;
            rows.push(row);
        }

        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    /// Imports an index CSV as the auxiliary series `<name>_open` and `<name>_close`.
    ///
    /// Rows missing either price are skipped.
    ///
    /// # Errors
    /// Returns error if reading the file or writing the series fails.
    pub async fn import_index(
        repo: &AuxiliaryRepository,
        name: &str,
        path: &Path,
    ) -> Result<ImportStats> {
        let rows = Self::read_index(path)?;

        let mut opens = Vec::with_capacity(rows.len());
        let mut closes = Vec::with_capacity(rows.len());
        let mut skipped = 0;
        for row in &rows {
            match (row.open, row.close) {
                (Some(open), Some(close)) => {
                    opens.push(AuxPoint {
                        day: row.date,
                        value: open,
                    });
                    closes.push(AuxPoint {
                        day: row.date,
                        value: close,
                    });
                }
                _ => {
                    tracing::debug!(series = name, day = %row.date, "Skipping row without prices");
                    skipped += 1;
                }
            }
        }

        let open_written = repo.upsert_batch(&format!("{name}_open"), &opens).await?;
        let close_written = repo.upsert_batch(&format!("{name}_close"), &closes).await?;

        Ok(ImportStats {
            rows: rows.len(),
            skipped,
            open_written,
            close_written,
        })
    }
}
