use anyhow::{Context, Result};
use std::path::Path;

/// An immutable, fully loaded CSV dataset: one header line plus data rows.
///
/// Rows are kept as raw text lines; the fabric never interprets columns,
/// it only slices contiguous row ranges into chunk payloads.
pub struct RowStore {
    header: String,
    rows: Vec<String>,
}

impl RowStore {
    /// Reads the file at `path`. The first line is the header; every
    /// following non-empty line is one data row.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read dataset {}", path.display()))?;

        let mut lines = raw.lines();
        let header = lines
            .next()
            .with_context(|| format!("dataset {} is empty", path.display()))?
            .to_string();

        let rows: Vec<String> = lines
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect();

        Ok(Self { header, rows })
    }

    /// In-memory constructor for tests and synthetic data.
    pub fn from_rows(header: &str, rows: Vec<String>) -> Self {
        Self {
            header: header.to_string(),
            rows,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Serializes rows `[start, start + count)` as a standalone CSV chunk:
    /// header line first, then the rows. Ranges are clamped to the dataset;
    /// an empty effective range yields an empty payload.
    pub fn extract(&self, start: usize, count: usize) -> Vec<u8> {
        let end = start.saturating_add(count).min(self.rows.len());
        if start >= end {
            return Vec::new();
        }

        let mut out = String::with_capacity(self.header.len() + (end - start) * 32);
        out.push_str(&self.header);
        out.push('\n');
        for row in &self.rows[start..end] {
            out.push_str(row);
            out.push('\n');
        }

        out.into_bytes()
    }
}
