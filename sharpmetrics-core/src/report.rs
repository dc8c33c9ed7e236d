//! Reporting and output generation
//!
//! Global invariants enforced:
//! - The CSV header is fixed per record type, even with no rows
//! - Rows keep the order the calculators produced them in

use crate::record::MetricRecord;
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Write the fixed header followed by one row per record
pub fn write_csv<R, W>(records: &[R], writer: W) -> Result<()>
where
    R: MetricRecord,
    W: Write,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(R::HEADER)
        .context("Failed to write CSV header")?;
    for record in records {
        csv_writer
            .serialize(record)
            .with_context(|| format!("Failed to write CSV row for {}", record.subject()))?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Parse rows written by [`write_csv`]
pub fn read_csv<R, Rd>(reader: Rd) -> Result<Vec<R>>
where
    R: MetricRecord,
    Rd: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let header: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    if header != R::HEADER {
        anyhow::bail!(
            "Unexpected CSV header: expected {}, found {}",
            R::HEADER.join(","),
            header.join(",")
        );
    }

    let mut records = Vec::new();
    for (index, row) in csv_reader.deserialize().enumerate() {
        let record: R = row.with_context(|| format!("Failed to parse CSV row {}", index + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Write records to a CSV file; nothing is written when there are none
pub fn save_to_file<R: MetricRecord>(records: &[R], path: &Path) -> Result<()> {
    if records.is_empty() {
        tracing::warn!(path = %path.display(), "no records, nothing written");
        return Ok(());
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_csv(records, std::io::BufWriter::new(file))
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}

/// Render records as console lines, one per record
pub fn render_console<R: MetricRecord>(records: &[R]) -> String {
    let mut output = String::new();
    for record in records {
        output.push_str(&record.to_string());
        output.push('\n');
    }
    output
}

/// Render records as JSON output
pub fn render_json<R: MetricRecord>(records: &[R]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize records as JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MethodRaw;
    use crate::record::MethodMetrics;

    fn method(name: &str, label: Option<i64>) -> MethodMetrics {
        MethodMetrics::new(
            name.to_string(),
            MethodRaw {
                cyclo: 4,
                cyclo_switch: 3,
                mloc: 20,
                meloc: 15,
                nop: 2,
                nolv: 3,
                notc: 1,
                mnol: 2,
                mnor: 0,
                mnoc: 1,
                mnoa: 0,
                nonl: 1,
                nosl: 4,
                nomo: 1,
                nope: 5,
                nole: 3,
                mmnb: 3,
                nouw: 1,
                aid: 0.3333333333333333,
                atfd: 6,
            },
            label,
        )
    }

    #[test]
    fn test_csv_round_trip() {
        let records = vec![
            method("Shop.Cart.Total", None),
            method("Shop.Cart.Add, \"quoted\"", Some(1)),
        ];
        let mut buffer = Vec::new();
        write_csv(&records, &mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("MethodName,Cyclo,CycloSwitch,"));

        let parsed: Vec<MethodMetrics> = read_csv(buffer.as_slice()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_header_written_without_rows() {
        let mut buffer = Vec::new();
        write_csv::<MethodMetrics, _>(&[], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.trim_end(), MethodMetrics::HEADER.join(","));
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let result: Result<Vec<MethodMetrics>> = read_csv("Name,Value\nx,1\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_save_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("methods.csv");
        save_to_file::<MethodMetrics>(&[], &path).unwrap();
        assert!(!path.exists());

        save_to_file(&[method("A.B", Some(0))], &path).unwrap();
        let parsed: Vec<MethodMetrics> = read_csv(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].label, Some(0));
    }

    #[test]
    fn test_render_console_and_json() {
        let records = vec![method("A.B", None)];
        let console = render_console(&records);
        assert!(console.starts_with("Method: A.B, CYCLO: 4"));
        assert_eq!(console.lines().count(), 1);

        let json = render_json(&records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["MethodName"], "A.B");
        assert_eq!(value[0]["Label"], serde_json::Value::Null);
    }
}
