// Tabular glue around the pipeline: pull the entity column out of a CSV file or
// spreadsheet range, and merge results back in by entity.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use enrich_common::{EnrichError, EnrichmentResult, Result};

/// Header row plus data rows, all cells as text. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| EnrichError::Table(format!("open {}: {e}", path.display())))?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = reader
            .headers()
            .map_err(table_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(table_err)
            })
            .collect::<Result<Vec<Vec<String>>>>()?;

        Ok(Self { headers, rows })
    }

    /// Spreadsheet values: first row is the header.
    pub fn from_values(values: Vec<Vec<String>>) -> Result<Self> {
        let mut values = values.into_iter();
        let headers = values
            .next()
            .ok_or_else(|| EnrichError::Table("sheet has no header row".to_string()))?;
        Ok(Self {
            headers,
            rows: values.collect(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                EnrichError::Table(format!(
                    "column {name:?} not found; available: {}",
                    self.headers.join(", ")
                ))
            })
    }

    /// One value per row for the named column. Short rows yield "".
    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or_default())
            .collect())
    }

    /// Write each result into `target_column` on every row whose `key_column`
    /// equals the result's entity. Adds the column if missing; rows without a
    /// result keep whatever the column already held. Returns rows filled.
    pub fn merge_results(
        &mut self,
        key_column: &str,
        target_column: &str,
        results: &[EnrichmentResult],
    ) -> Result<usize> {
        let key_idx = self.column_index(key_column)?;
        let target_idx = match self.headers.iter().position(|h| h == target_column) {
            Some(idx) => idx,
            None => {
                self.headers.push(target_column.to_string());
                self.headers.len() - 1
            }
        };

        let by_entity: HashMap<&str, &str> = results
            .iter()
            .map(|r| (r.entity.as_str(), r.extracted_info.as_str()))
            .collect();

        let width = self.headers.len();
        let mut filled = 0;
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
            if let Some(info) = by_entity.get(row[key_idx].as_str()) {
                row[target_idx] = info.to_string();
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Header row followed by data rows, the layout spreadsheets expect.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for row in self.to_values() {
            writer.write_record(&row).map_err(table_err)?;
        }
        writer.flush().map_err(|e| EnrichError::Table(e.to_string()))
    }
}

/// Results as CSV with columns `entity,extracted_info`.
pub fn write_results_csv<W: Write>(results: &[EnrichmentResult], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if results.is_empty() {
        writer
            .write_record(["entity", "extracted_info"])
            .map_err(table_err)?;
    }
    for result in results {
        writer.serialize(result).map_err(table_err)?;
    }
    writer.flush().map_err(|e| EnrichError::Table(e.to_string()))
}

fn table_err(err: csv::Error) -> EnrichError {
    EnrichError::Table(err.to_string())
}
