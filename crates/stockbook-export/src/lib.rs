//! Tabular export formatters.
//!
//! All exporters consume a uniform row shape: a slice of JSON objects, one
//! per row. Column order comes from the first row's keys; nested objects
//! render by their `name` field when they carry one.

pub mod error;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::{ExportError, ExportResult};

// ==================== Formats ====================

/// Supported export formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Markdown,
    Json,
    Xml,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            _ => Err(ExportError::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
        };
        write!(f, "{}", s)
    }
}

impl ExportFormat {
    /// MIME type of the rendered document
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Xml => "application/xml",
        }
    }
}

// ==================== Exporters ====================

/// Renders a slice of JSON object rows into a textual document
pub trait TableExporter {
    fn export(&self, rows: &[Value]) -> ExportResult<String>;
}

/// Factory for the exporter matching a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn TableExporter + Send + Sync> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter),
        ExportFormat::Markdown => Box::new(MarkdownExporter),
        ExportFormat::Json => Box::new(JsonExporter),
        ExportFormat::Xml => Box::new(XmlExporter),
    }
}

/// Render rows in the given format
pub fn export(format: ExportFormat, rows: &[Value]) -> ExportResult<String> {
    exporter_for(format).export(rows)
}

/// Semicolon-delimited CSV with a header row
pub struct CsvExporter;

impl TableExporter for CsvExporter {
    fn export(&self, rows: &[Value]) -> ExportResult<String> {
        let fields = header_fields(rows)?;
        let mut buffer = Vec::new();
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b';')
                .from_writer(&mut buffer);
            writer.write_record(&fields)?;
            for row in rows {
                let record: Vec<String> = fields.iter().map(|f| cell_text(row, f)).collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
        }
        String::from_utf8(buffer).map_err(|_| ExportError::InvalidUtf8)
    }
}

/// Pipe-delimited Markdown table
pub struct MarkdownExporter;

impl TableExporter for MarkdownExporter {
    fn export(&self, rows: &[Value]) -> ExportResult<String> {
        let fields = header_fields(rows)?;
        let mut text = format!("| {} |\n", fields.join(" | "));
        text.push_str(&format!("| {} |\n", vec!["---"; fields.len()].join(" | ")));
        for row in rows {
            let cells: Vec<String> = fields.iter().map(|f| cell_text(row, f)).collect();
            text.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        Ok(text)
    }
}

/// Pretty-printed JSON array
pub struct JsonExporter;

impl TableExporter for JsonExporter {
    fn export(&self, rows: &[Value]) -> ExportResult<String> {
        if rows.is_empty() {
            return Err(ExportError::NoData);
        }
        let flattened: Vec<Value> = rows
            .iter()
            .map(|row| match row.as_object() {
                Some(map) => {
                    let entries = map
                        .iter()
                        .map(|(k, v)| (k.clone(), flatten_value(v)))
                        .collect();
                    Value::Object(entries)
                }
                None => row.clone(),
            })
            .collect();
        serde_json::to_string_pretty(&flattened).map_err(|_| ExportError::InvalidUtf8)
    }
}

/// `<data><item>...</item></data>` document, one `<item>` per row
pub struct XmlExporter;

impl TableExporter for XmlExporter {
    fn export(&self, rows: &[Value]) -> ExportResult<String> {
        let fields = header_fields(rows)?;
        let mut text = String::from("<data>");
        for row in rows {
            text.push_str("<item>");
            for field in &fields {
                text.push('<');
                text.push_str(field);
                text.push('>');
                text.push_str(&xml_escape(&cell_text(row, field)));
                text.push_str("</");
                text.push_str(field);
                text.push('>');
            }
            text.push_str("</item>");
        }
        text.push_str("</data>");
        Ok(text)
    }
}

// ==================== Cell rendering ====================

/// Column names from the first row; empty input is refused
fn header_fields(rows: &[Value]) -> ExportResult<Vec<String>> {
    let first = rows.first().ok_or(ExportError::NoData)?;
    let map = first.as_object().ok_or(ExportError::NoData)?;
    Ok(map.keys().cloned().collect())
}

/// Scalar text for one cell. Nested objects render by their `name` field
/// when present, otherwise as compact JSON.
fn cell_text(row: &Value, field: &str) -> String {
    let value = match row.get(field) {
        Some(value) => value,
        None => return String::new(),
    };
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => match map.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => value.to_string(),
        },
        Value::Array(items) => items.len().to_string(),
    }
}

/// Collapse nested objects to their `name` for the JSON export, mirroring
/// the scalar cell rendering of the tabular formats
fn flatten_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => match map.get("name").and_then(Value::as_str) {
            Some(name) => Value::String(name.to_string()),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_rows() -> Vec<Value> {
        vec![
            json!({"name": "gram", "coefficient": 1, "base_unit": null}),
            json!({"name": "kg", "coefficient": 1000, "base_unit": {"name": "gram"}}),
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_empty_rows_are_an_error() {
        for format in [
            ExportFormat::Csv,
            ExportFormat::Markdown,
            ExportFormat::Json,
            ExportFormat::Xml,
        ] {
            assert!(matches!(export(format, &[]), Err(ExportError::NoData)));
        }
    }

    #[test]
    fn test_csv_uses_semicolons() {
        let text = export(ExportFormat::Csv, &sample_rows()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "base_unit;coefficient;name");
        assert_eq!(lines.next().unwrap(), ";1;gram");
        assert_eq!(lines.next().unwrap(), "gram;1000;kg");
    }

    #[test]
    fn test_markdown_table_shape() {
        let text = export(ExportFormat::Markdown, &sample_rows()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "| base_unit | coefficient | name |");
        assert_eq!(lines[1], "| --- | --- | --- |");
        assert_eq!(lines[3], "| gram | 1000 | kg |");
    }

    #[test]
    fn test_json_flattens_nested_records() {
        let text = export(ExportFormat::Json, &sample_rows()).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[1]["base_unit"], "gram");
    }

    #[test]
    fn test_xml_structure_and_escaping() {
        let rows = vec![json!({"name": "salt & pepper"})];
        let text = export(ExportFormat::Xml, &rows).unwrap();
        assert_eq!(text, "<data><item><name>salt &amp; pepper</name></item></data>");
    }
}
