//! Rendering of command results.
//!
//! Commands print through a [`Printer`] bound to `--format`. In JSON mode
//! every line is a standalone JSON document, notes included, so the CLI can
//! be scripted against the registry.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tabled::{Table, Tabled};

use kiosk_core::config::AppConfig;
use kiosk_core::error::AppError;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON, one document per line
    Json,
}

/// How a command step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Warning,
    Error,
}

impl Outcome {
    fn mark(self) -> char {
        match self {
            Outcome::Ok => '✓',
            Outcome::Warning => '⚠',
            Outcome::Error => '✗',
        }
    }
}

const MASK: &str = "****";

/// Writes command output in one format.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// One-line status note. Errors go to stderr.
    pub fn note(&self, outcome: Outcome, message: &str) {
        let line = render_note(self.format, outcome, message);
        match outcome {
            Outcome::Error => eprintln!("{}", line),
            Outcome::Ok | Outcome::Warning => println!("{}", line),
        }
    }

    /// A list of records; `empty` is shown instead of a header-only table.
    pub fn rows<T: Serialize + Tabled>(&self, rows: &[T], empty: &str) -> Result<(), AppError> {
        println!("{}", render_rows(self.format, rows, empty)?);
        Ok(())
    }

    /// Labelled values of a single record.
    pub fn fields(&self, fields: &[(&str, String)]) {
        println!("{}", render_fields(self.format, fields));
    }

    /// The effective configuration with the registry API key masked.
    /// Table mode lists it as dotted keys, e.g. `admission.poll_interval_seconds`.
    pub fn config(&self, config: &AppConfig) -> Result<(), AppError> {
        let value = masked_config(config)?;
        match self.format {
            OutputFormat::Table => {
                let flat = flatten(&value);
                let fields: Vec<(&str, String)> = flat
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.clone()))
                    .collect();
                self.fields(&fields);
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        }
        Ok(())
    }
}

fn render_note(format: OutputFormat, outcome: Outcome, message: &str) -> String {
    match format {
        OutputFormat::Table => format!("{} {}", outcome.mark(), message),
        OutputFormat::Json => json!({ "status": outcome, "message": message }).to_string(),
    }
}

fn render_rows<T: Serialize + Tabled>(
    format: OutputFormat,
    rows: &[T],
    empty: &str,
) -> Result<String, AppError> {
    Ok(match format {
        OutputFormat::Table if rows.is_empty() => empty.to_string(),
        OutputFormat::Table => Table::new(rows).to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
    })
}

fn render_fields(format: OutputFormat, fields: &[(&str, String)]) -> String {
    match format {
        OutputFormat::Table => {
            let width = fields.iter().map(|(key, _)| key.len()).max().unwrap_or(0) + 1;
            fields
                .iter()
                .map(|(key, value)| format!("  {:<width$} {}", format!("{}:", key), value))
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Json => {
            let object: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
                .collect();
            Value::Object(object).to_string()
        }
    }
}

fn masked_config(config: &AppConfig) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(config)?;
    if let Some(key) = value
        .pointer_mut("/registry/api_key")
        .filter(|key| !key.is_null())
    {
        *key = Value::String(MASK.to_string());
    }
    Ok(value)
}

/// Leaf values keyed by their dotted path.
fn flatten(value: &Value) -> Vec<(String, String)> {
    fn walk(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    walk(&path, child, out);
                }
            }
            Value::Null => out.push((prefix.to_string(), "-".to_string())),
            Value::String(text) => out.push((prefix.to_string(), text.clone())),
            other => out.push((prefix.to_string(), other.to_string())),
        }
    }

    let mut out = Vec::new();
    walk("", value, &mut out);
    out
}
