// ============================================================
// CSV DECODER
// ============================================================
// Plain comma-separated text into nested records. No quoting or escaping:
// a comma always separates cells.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use tracing::{debug, warn};

use super::inference::infer_scalar;
use crate::domain::error::{AppError, Result};
use crate::domain::record::Record;

const PATH_SEPARATOR: char = '.';

/// A header cell split into its nested path segments (`name.firstName` -> `["name", "firstName"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPath {
    segments: Vec<String>,
}

impl HeaderPath {
    pub fn parse(header: &str) -> Self {
        Self {
            segments: header
                .trim()
                .split(PATH_SEPARATOR)
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Decode raw CSV text. Empty (or whitespace-only) input yields no records.
pub fn decode(content: &str) -> Result<Vec<Record>> {
    let content = content.trim();
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .quoting(false)
        .terminator(Terminator::Any(b'\n'))
        .trim(Trim::None)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut lines = reader.records();

    let headers: Vec<HeaderPath> = match lines.next() {
        Some(first) => first
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(HeaderPath::parse)
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line.map_err(|e| {
            AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
        })?;

        if is_blank(&line) {
            continue;
        }

        records.push(build_record(&headers, &line));
    }

    Ok(records)
}

/// Read and decode a CSV file. A missing file is treated as empty input.
pub async fn decode_file(path: &Path) -> Result<Vec<Record>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "CSV source not found, treating as empty");
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(AppError::IoError(format!(
                "Failed to read {}: {}",
                path.display(),
                err
            )))
        }
    };

    let content = String::from_utf8_lossy(&bytes);
    decode(&content)
}

fn is_blank(line: &StringRecord) -> bool {
    line.len() <= 1 && line.iter().all(|cell| cell.trim().is_empty())
}

fn build_record(headers: &[HeaderPath], line: &StringRecord) -> Record {
    let mut record = Record::new();
    for (column, header) in headers.iter().enumerate() {
        let value = infer_scalar(line.get(column).map(str::trim));
        if !record.set_path(header.segments(), value) {
            debug!(
                header = %header.segments().join("."),
                "Skipped cell whose parent path already holds a scalar"
            );
        }
    }
    record
}
