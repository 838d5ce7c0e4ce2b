//! Output formatting for rows.
//!
//! Supports table, JSON and CSV output.

use std::fmt;
use std::str::FromStr;

use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::{json, Value as JsonValue};

use trellis_client::{ResultSet, Tuple, Value};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
    /// CSV output.
    Csv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => anyhow::bail!("unknown output format '{other}' (expected table, json or csv)"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// Materialized rows with a fixed column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    /// Column names, in output order.
    pub columns: Vec<String>,
    /// The rows.
    pub rows: Vec<Tuple>,
}

impl Rows {
    /// Drains a result set.
    pub fn from_result_set(result: ResultSet) -> Self {
        let columns = result.columns().to_vec();
        Self {
            columns,
            rows: result.collect(),
        }
    }

    /// Collects tuples, taking the column order from the first one.
    pub fn from_tuples(rows: impl IntoIterator<Item = Tuple>) -> Self {
        let rows: Vec<Tuple> = rows.into_iter().collect();
        let columns = rows
            .first()
            .map(|r| r.keys().map(str::to_string).collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    fn cells<'a>(&'a self, row: &'a Tuple) -> impl Iterator<Item = &'a Value> + 'a {
        self.columns
            .iter()
            .map(|c| row.column(c).unwrap_or(&Value::Null))
    }
}

/// Formats rows according to the specified format.
pub fn format_rows(rows: &Rows, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(rows),
        OutputFormat::Json => format_json(rows),
        OutputFormat::Csv => format_csv(rows),
    }
}

fn format_table(rows: &Rows) -> String {
    let mut table = Table::new();

    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

    if !rows.columns.is_empty() {
        table.set_header(rows.columns.iter().map(Cell::new));
    }
    for row in &rows.rows {
        table.add_row(rows.cells(row).map(|v| Cell::new(v.to_string())));
    }

    table.to_string()
}

fn format_json(rows: &Rows) -> String {
    let objects: Vec<JsonValue> = rows
        .rows
        .iter()
        .map(|row| {
            let obj = rows
                .columns
                .iter()
                .zip(rows.cells(row))
                .map(|(c, v)| (c.clone(), value_to_json(v)))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();

    serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(*b),
        Value::Int8(i) => json!(*i),
        Value::Int16(i) => json!(*i),
        Value::Int32(i) => json!(*i),
        Value::Int64(i) => json!(*i),
        Value::Float32(f) => json!(*f),
        Value::Float64(f) => json!(*f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => json!(b),
    }
}

fn format_csv(rows: &Rows) -> String {
    let mut output = String::new();

    if !rows.columns.is_empty() {
        let header: Vec<String> = rows.columns.iter().map(|c| escape_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');
    }

    for row in &rows.rows {
        let values: Vec<String> = rows
            .cells(row)
            .map(|v| match v {
                Value::Null => String::new(),
                v => escape_csv(&v.to_string()),
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn albums() -> Rows {
        Rows {
            columns: vec!["ALBUMID".into(), "TITLE".into(), "RELEASEYEAR".into()],
            rows: vec![
                Tuple::new()
                    .set("albumId", 349)
                    .set("title", "Technique")
                    .set("releaseYear", 1989),
                Tuple::new()
                    .set("albumId", 1)
                    .set("title", "Rock, Vol. \"1\"")
                    .set("releaseYear", Value::Null),
            ],
        }
    }

    #[test]
    fn test_format_table() {
        let output = format_rows(&albums(), OutputFormat::Table);
        assert!(output.contains("TITLE"));
        assert!(output.contains("Technique"));
        assert!(output.contains("NULL"));
    }

    #[test]
    fn test_format_json() {
        let output = format_rows(&albums(), OutputFormat::Json);
        let parsed: Vec<JsonValue> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["RELEASEYEAR"], json!(1989));
        assert_eq!(parsed[1]["RELEASEYEAR"], JsonValue::Null);
    }

    #[test]
    fn test_format_csv() {
        let output = format_rows(&albums(), OutputFormat::Csv);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ALBUMID,TITLE,RELEASEYEAR");
        assert_eq!(lines[1], "349,Technique,1989");
        assert_eq!(lines[2], "1,\"Rock, Vol. \"\"1\"\"\",");
    }

    #[test]
    fn test_rows_from_tuples_and_result_set() {
        let rows = Rows::from_tuples([Tuple::new().set("artistId", 277).set("name", "New Order")]);
        assert_eq!(rows.columns, vec!["ARTISTID".to_string(), "NAME".to_string()]);
        assert!(Rows::from_tuples(Vec::new()).columns.is_empty());

        let rs = ResultSet::new(vec!["NAME".into()], vec![Tuple::new().set("name", "x")].into_iter());
        let rows = Rows::from_result_set(rs);
        assert_eq!(rows.rows.len(), 1);
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
