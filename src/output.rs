use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

// ---------------------------------------------------------------------------
// Table – labelled rows of numbers
// ---------------------------------------------------------------------------

/// A result table: one text label column followed by numeric columns.
#[derive(Debug, Clone)]
pub struct Table {
    label: String,
    columns: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl Table {
    pub fn new<S: Into<String>>(label: &str, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            label: label.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, label: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push((label, values));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write to `path`, or stdout when `None`.
    pub fn write(&self, format: OutputFormat, path: Option<&Path>) -> Result<()> {
        let sink: Box<dyn Write> = match path {
            Some(p) => Box::new(BufWriter::new(
                File::create(p).with_context(|| format!("creating {}", p.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        };
        match format {
            OutputFormat::Csv => self.write_csv(sink),
            OutputFormat::Json => self.write_json(sink),
        }
    }

    pub(crate) fn write_csv<W: Write>(&self, sink: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);
        writer
            .write_record(std::iter::once(&self.label).chain(&self.columns))
            .context("writing CSV header")?;
        for (label, values) in &self.rows {
            let record = std::iter::once(label.clone()).chain(values.iter().map(f64::to_string));
            writer
                .write_record(record)
                .with_context(|| format!("writing CSV row {label}"))?;
        }
        writer.flush().context("flushing CSV output")?;
        Ok(())
    }

    pub(crate) fn write_json<W: Write>(&self, mut sink: W) -> Result<()> {
        let records: Vec<JsonValue> = self
            .rows
            .iter()
            .map(|(label, values)| {
                let mut obj = Map::new();
                obj.insert(self.label.clone(), JsonValue::String(label.clone()));
                for (col, v) in self.columns.iter().zip(values) {
                    // NaN and infinities have no JSON form and become null
                    obj.insert(col.clone(), serde_json::Number::from_f64(*v).into());
                }
                JsonValue::Object(obj)
            })
            .collect();
        serde_json::to_writer_pretty(&mut sink, &records).context("writing JSON output")?;
        writeln!(sink).context("writing JSON output")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new("bin", ["l_lo", "l_hi"]);
        t.push("0".into(), vec![2.0, 26.5]);
        t
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        sample().write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "bin,l_lo,l_hi\n0,2,26.5\n");
    }

    #[test]
    fn json_records_are_keyed_by_column() {
        let mut buf = Vec::new();
        sample().write_json(&mut buf).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed[0]["bin"], "0");
        assert_eq!(parsed[0]["l_hi"], 26.5);
    }
}
