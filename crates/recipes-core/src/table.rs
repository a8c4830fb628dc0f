//! CSV table loading
//!
//! Every cell is classified once at load time into a [`Cell`], so the
//! normalizer can dispatch on declared parameter type without re-inspecting
//! raw strings for "missing" markers.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Markers treated as missing values, matching pandas' default `na_values`.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A raw cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Absent from the row, blank, or an NA marker
    Missing,
    /// Text that parses as a finite number (kept verbatim)
    Numeric(String),
    /// Any other text (kept verbatim)
    Text(String),
}

impl Cell {
    /// Classify a raw field.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_MARKERS.contains(&trimmed) {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Numeric(raw.to_string()),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// The verbatim text, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Missing => None,
            Cell::Numeric(s) | Cell::Text(s) => Some(s),
        }
    }
}

/// Errors raised while loading a table
#[derive(Debug, Error)]
pub enum TableError {
    #[error("[Errno 2] No such file or directory: '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A quoted field is still open at end of input
    #[error("Error tokenizing data. C error: EOF inside string starting at line {line}")]
    UnterminatedQuote { line: u64 },

    /// A data row carries more fields than the header row
    #[error("Error tokenizing data. Expected {expected} fields in line {line}, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// A loaded CSV: header row plus data rows of classified cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    /// Read and parse the file at `path`.
    pub async fn load(path: &Path) -> Result<Self, TableError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TableError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(TableError::Io(e)),
        };
        let table = Self::from_bytes(&bytes)?;
        debug!(
            path = %path.display(),
            columns = table.headers.len(),
            rows = table.rows.len(),
            "Loaded CSV table"
        );
        Ok(table)
    }

    /// Parse CSV content with a header row.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        if let Some(line) = unterminated_quote_line(bytes) {
            return Err(TableError::UnterminatedQuote { line });
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // A UTF-8 BOM can only lead the first header
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        // A lone empty header means the file had no header row at all
        if headers.len() == 1 && headers[0].is_empty() {
            return Ok(Self::default());
        }
        let headers = dedupe_headers(headers);

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            if is_blank_line(&record) {
                continue;
            }
            if record.len() > headers.len() {
                return Err(TableError::RaggedRow {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let mut cells: Vec<Cell> = record.iter().map(Cell::classify).collect();
            cells.resize(headers.len(), Cell::Missing);
            rows.push(cells);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cell at `(row, column)`, or [`Cell::Missing`] when out of range.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Cell::Missing)
    }
}

/// Name blank headers `Unnamed: <index>` and suffix repeats with `.1`, `.2`
/// until every name is unique.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, header)| {
            let mut name = if header.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                header
            };
            let mut seen = counts.get(&name).copied().unwrap_or(0);
            while seen > 0 {
                counts.insert(name.clone(), seen + 1);
                name = format!("{}.{}", name, seen);
                seen = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), 1);
            name
        })
        .collect()
}

/// Line (1-based) where a quoted field opens without ever closing.
fn unterminated_quote_line(bytes: &[u8]) -> Option<u64> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let mut line = 1u64;
    let mut open_at = None;
    let mut field_start = true;
    let mut iter = bytes.iter().peekable();

    while let Some(&b) = iter.next() {
        if open_at.is_some() {
            match b {
                b'"' if iter.peek() == Some(&&b'"') => {
                    iter.next();
                }
                b'"' => {
                    open_at = None;
                    field_start = false;
                }
                b'\n' => line += 1,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if field_start => {
                open_at = Some(line);
                field_start = false;
            }
            b',' | b'\r' => field_start = true,
            b'\n' => {
                line += 1;
                field_start = true;
            }
            _ => field_start = false,
        }
    }
    open_at
}

fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(|f| f.trim().is_empty())
}
