//! Externally labelled methods
//!
//! An annotation CSV maps a fully qualified method name to an integer label.
//! When supplied, the method pass keeps only the annotated methods.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Read `id_column -> label_column` pairs from a CSV file with a header row
///
/// Rows without an id are skipped, a missing or unparsable label reads as 0,
/// and the first row for an id wins.
pub fn read_annotations(
    path: &Path,
    id_column: &str,
    label_column: &str,
) -> Result<HashMap<String, i64>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open annotations: {}", path.display()))?;
    parse_annotations(file, id_column, label_column)
        .with_context(|| format!("Failed to read annotations: {}", path.display()))
}

fn parse_annotations<R: std::io::Read>(
    reader: R,
    id_column: &str,
    label_column: &str,
) -> Result<HashMap<String, i64>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?;
    let id_index = headers
        .iter()
        .position(|header| header == id_column)
        .with_context(|| format!("Missing annotation id column '{}'", id_column))?;
    let label_index = headers
        .iter()
        .position(|header| header == label_column)
        .with_context(|| format!("Missing annotation label column '{}'", label_column))?;

    let mut annotations = HashMap::new();
    for row in csv_reader.records() {
        let row = row.context("Failed to read annotation row")?;
        let Some(id) = row.get(id_index).filter(|id| !id.is_empty()) else {
            continue;
        };
        let label = row
            .get(label_index)
            .and_then(|label| label.parse::<i64>().ok())
            .unwrap_or(0);
        annotations.entry(id.to_string()).or_insert(label);
    }

    tracing::debug!(annotations = annotations.len(), "annotations loaded");
    Ok(annotations)
}
