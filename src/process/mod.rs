// src/process/mod.rs
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::{fs, io::Cursor, path::Path};
use tracing::{debug, warn};

pub mod date_parser;
pub mod merge;
pub mod normalize;
pub mod region;
pub mod utils;

pub use merge::{merge_tables, UnifiedTable};
pub use normalize::{normalize_table, FieldValue, NormalizedTable, Row, Warning};
pub use region::Region;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct RawTable {
    /// File name the table was uploaded as; drives region inference.
    pub source: String,
    /// Column names from the header row, in file order.
    pub headers: Vec<String>,
    /// Each data row, as a Vec of Strings (one per field).
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `row`/`col`, or `""` if the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parse an uploaded CSV into a RawTable.
///
/// The first record is the header row. Records may have differing field
/// counts; short rows read as empty cells. Invalid UTF-8 is replaced rather
/// than rejected.
#[tracing::instrument(level = "info", skip(data), fields(bytes = data.len()))]
pub fn load_csv_bytes(source: &str, data: &[u8]) -> Result<RawTable> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let text = String::from_utf8_lossy(data);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(text.as_bytes()));

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header row of {}", source))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        bail!("{} has no header row", source);
    }

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", source, idx))?;
        if record.len() > headers.len() {
            warn!(
                file = %source,
                record = idx,
                cells = record.len(),
                headers = headers.len(),
                "row has more cells than headers"
            );
        }
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    debug!(file = %source, columns = headers.len(), rows = rows.len(), "loaded csv");
    Ok(RawTable {
        source: source.to_string(),
        headers,
        rows,
    })
}

/// Read and parse a CSV file from disk, using its file name as the source.
pub fn load_csv_file<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    load_csv_bytes(&name, &data)
}
