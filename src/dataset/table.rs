// src/dataset/table.rs
//! Raw CSV ingestion
//!
//! Parses uploaded bytes into a column-typed table. Delimiters are
//! sniffed in a fixed order (comma, semicolon, tab, pipe); the first one
//! producing at least two header columns wins. A column is numeric when
//! every non-missing cell parses as a float, otherwise it is text.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::PrepareError;

/// Delimiters tried during parsing, in order
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Number of rows returned by [`RawTable::preview`]
pub const PREVIEW_ROWS: usize = 5;

/// Cell storage for one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Every non-missing cell parsed as a float
    Numeric(Vec<Option<f64>>),
    /// At least one non-missing cell did not parse
    Text(Vec<Option<String>>),
}

/// A named column of the parsed table
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    /// Distinct non-missing values in this column
    pub fn distinct_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v
                .iter()
                .flatten()
                .map(|x| x.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Text(v) => v
                .iter()
                .flatten()
                .map(|s| s.as_str())
                .collect::<HashSet<_>>()
                .len(),
        }
    }

    /// Cell rendered for previews; missing cells render empty
    pub fn display_value(&self, row: usize) -> String {
        match &self.data {
            ColumnData::Numeric(v) => v[row].map(format_numeric).unwrap_or_default(),
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }
}

/// A parsed CSV table with ordered, typed columns
#[derive(Debug, Clone)]
pub struct RawTable {
    columns: Vec<Column>,
    n_rows: usize,
}

/// First rows of a table, shaped for the upload preview
#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub headers: Vec<String>,
    #[serde(rename = "nRows")]
    pub n_rows: usize,
    #[serde(rename = "nCols")]
    pub n_cols: usize,
    #[serde(rename = "missingCount")]
    pub missing_count: usize,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse CSV bytes, sniffing the delimiter
    pub fn parse(bytes: &[u8]) -> Result<Self, PrepareError> {
        let text = String::from_utf8_lossy(bytes);
        if text.trim().is_empty() {
            return Err(PrepareError::Parse("input is empty".to_string()));
        }

        let mut last_error = String::from("fewer than 2 columns");
        for delim in DELIMITER_CANDIDATES {
            match Self::parse_delimited(&text, delim) {
                Ok(table) if table.n_cols() >= 2 => {
                    debug!(delimiter = ?delim, rows = table.n_rows, cols = table.n_cols(), "parsed csv");
                    return Ok(table);
                }
                Ok(_) => {}
                Err(e) => last_error = e,
            }
        }
        Err(PrepareError::Parse(format!(
            "could not parse CSV with any supported delimiter ({})",
            last_error
        )))
    }

    fn parse_delimited(text: &str, delim: char) -> Result<Self, String> {
        let mut records = split_records(text, delim);
        if records.is_empty() {
            return Err("no header row".to_string());
        }

        let headers: Vec<String> = records.remove(0).iter().map(|h| h.trim().to_string()).collect();
        let n_cols = headers.len();

        let mut cells: Vec<Vec<String>> = Vec::new();
        for (line, mut record) in records.into_iter().enumerate() {
            if record.len() == 1 && record[0].trim().is_empty() {
                continue; // blank line
            }
            if record.len() > n_cols {
                return Err(format!(
                    "row {} has {} fields, header has {}",
                    line + 2,
                    record.len(),
                    n_cols
                ));
            }
            record.resize(n_cols, String::new());
            cells.push(record);
        }

        let n_rows = cells.len();
        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(c, name)| {
                let raw: Vec<Option<&str>> = cells
                    .iter()
                    .map(|row| {
                        let v = row[c].trim();
                        if is_missing_marker(v) {
                            None
                        } else {
                            Some(v)
                        }
                    })
                    .collect();
                Column {
                    name,
                    data: type_column(&raw),
                }
            })
            .collect();

        Ok(RawTable { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Total missing cells across the table
    pub fn missing_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| (0..self.n_rows).filter(|&r| c.is_missing(r)).count())
            .sum()
    }

    /// Headers, shape, missing-cell count and the first few rows
    pub fn preview(&self) -> TablePreview {
        let shown = self.n_rows.min(PREVIEW_ROWS);
        let rows = (0..shown)
            .map(|r| self.columns.iter().map(|c| c.display_value(r)).collect())
            .collect();
        TablePreview {
            headers: self.column_names(),
            n_rows: self.n_rows,
            n_cols: self.n_cols(),
            missing_count: self.missing_count(),
            rows,
        }
    }
}

/// Render a float the way a label should read: integral values drop the
/// fractional part ("1", not "1.0")
pub(crate) fn format_numeric(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

fn is_missing_marker(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "" | "na" | "nan" | "null" | "none"
    )
}

fn type_column(raw: &[Option<&str>]) -> ColumnData {
    let all_numeric = raw
        .iter()
        .flatten()
        .all(|s| s.parse::<f64>().is_ok());
    let any_present = raw.iter().any(|c| c.is_some());

    if all_numeric && any_present {
        ColumnData::Numeric(raw.iter().map(|c| c.and_then(|s| s.parse().ok())).collect())
    } else {
        ColumnData::Text(raw.iter().map(|c| c.map(str::to_string)).collect())
    }
}

/// Split text into records of fields, honoring double-quoted fields with
/// doubled-quote escapes and quoted newlines
fn split_records(text: &str, delim: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                '\r' => {}
                '\n' => {
                    fields.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut fields));
                }
                c if c == delim => fields.push(std::mem::take(&mut field)),
                c => field.push(c),
            }
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }
    records
}
