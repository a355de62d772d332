//! Output formatters for query results.
//!
//! Renders a materialized result set as a box-drawn table, JSON, or CSV.
//! The formatter is the only consumer of a result; nothing here talks to
//! the database.

use crate::db::{QueryResult, Value};
use crate::error::{Result, RsqError};
use std::str::FromStr;

/// Maximum column width before cell truncation.
const MAX_COLUMN_WIDTH: usize = 64;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Box-drawn table with a row-count footer.
    #[default]
    Table,
    /// JSON array of row objects keyed by column name.
    Json,
    /// CSV with a header row.
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: table, json, or csv"
            )),
        }
    }
}

/// Formats query results for display.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders a query result in the configured format.
    pub fn format(&self, result: &QueryResult) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_table(result)),
            OutputFormat::Json => self.format_json(result),
            OutputFormat::Csv => Ok(self.format_csv(result)),
        }
    }

    /// Formats as a box-drawn table.
    fn format_table(&self, result: &QueryResult) -> String {
        let elapsed_ms = result.elapsed.as_secs_f64() * 1000.0;

        // Statements that produce no result set (DDL, INSERT, ...) have no
        // columns to draw.
        if result.columns.is_empty() {
            return format!("Query OK\n\nTime: {elapsed_ms:.3} ms");
        }

        let string_rows: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| row.iter().map(Value::render).collect())
            .collect();

        let mut col_widths: Vec<usize> = result
            .columns
            .iter()
            .map(|col| col.name.chars().count())
            .collect();
        for row in &string_rows {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.chars().count());
            }
        }
        for width in col_widths.iter_mut() {
            *width = (*width).min(MAX_COLUMN_WIDTH);
        }

        let mut output = String::new();

        push_border(&mut output, &col_widths, '┌', '┬', '┐');

        output.push('│');
        for (i, col) in result.columns.iter().enumerate() {
            let cell = truncate_cell(&col.name, col_widths[i]);
            output.push_str(&format!(" {:width$} │", cell, width = col_widths[i]));
        }
        output.push('\n');

        push_border(&mut output, &col_widths, '├', '┼', '┤');

        for row in &string_rows {
            output.push('│');
            for (i, value) in row.iter().enumerate() {
                let cell = truncate_cell(value, col_widths[i]);
                output.push_str(&format!(" {:width$} │", cell, width = col_widths[i]));
            }
            output.push('\n');
        }

        push_border(&mut output, &col_widths, '└', '┴', '┘');

        let row_count = result.row_count();
        let row_label = if row_count == 1 { "row" } else { "rows" };
        output.push_str(&format!("({row_count} {row_label})\n"));

        if let Some(notice) = result.truncation_notice() {
            output.push_str(&notice);
            output.push('\n');
        }

        output.push_str(&format!("\nTime: {elapsed_ms:.3} ms"));

        output
    }

    /// Formats as a JSON array of row objects.
    fn format_json(&self, result: &QueryResult) -> Result<String> {
        let rows: Vec<serde_json::Value> = result
            .rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = result
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), json_value(value)))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();

        serde_json::to_string_pretty(&rows).map_err(|e| RsqError::internal(e.to_string()))
    }

    /// Formats as CSV with a header row.
    fn format_csv(&self, result: &QueryResult) -> String {
        if result.columns.is_empty() {
            return String::new();
        }

        let header: Vec<String> = result
            .columns
            .iter()
            .map(|col| csv_escape(&col.name))
            .collect();
        let mut output = header.join(",") + "\n";

        for row in &result.rows {
            let values: Vec<String> = row.iter().map(|v| csv_escape(&v.render())).collect();
            output.push_str(&values.join(","));
            output.push('\n');
        }

        output
    }
}

/// Appends one horizontal border line to the output.
fn push_border(output: &mut String, col_widths: &[usize], left: char, mid: char, right: char) {
    output.push(left);
    for (idx, width) in col_widths.iter().enumerate() {
        output.push_str(&"─".repeat(width + 2));
        output.push(if idx == col_widths.len() - 1 {
            right
        } else {
            mid
        });
    }
    output.push('\n');
}

/// Truncates a cell to the column width with an ellipsis.
fn truncate_cell(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else if max_width <= 3 {
        value.chars().take(max_width).collect()
    } else {
        let take = max_width - 3;
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

/// Converts a database value to its JSON representation.
fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(_) => serde_json::Value::String(value.render()),
    }
}

/// Escapes a CSV field (quote when it contains a comma, quote, or newline).
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
