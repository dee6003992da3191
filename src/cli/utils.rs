use serde_json::{json, Value};
use std::io::Read;

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "message": message });
            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a single record: pretty JSON, or `key: value` lines.
pub fn output_record(output_format: &OutputFormat, record: &Value) -> anyhow::Result<()> {
    match (output_format, record) {
        (OutputFormat::Text, Value::Object(fields)) => {
            for (key, value) in fields {
                println!("{}: {}", key, display_value(value));
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(record)?),
    }
    Ok(())
}

/// Print a collection, one summary line per record in text mode.
pub fn output_records(output_format: &OutputFormat, records: &[Value], empty_message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text if records.is_empty() => println!("{}", empty_message),
        OutputFormat::Text => {
            for record in records {
                println!("{}", summary_line(record));
            }
        }
    }
    Ok(())
}

fn summary_line(record: &Value) -> String {
    let id = record.get("id").map(display_value).unwrap_or_default();
    let label = ["name", "title", "email", "subject"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .unwrap_or("");
    format!("{:>6}  {}", id, label)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JSON body from `--data`, or from stdin when the flag is absent.
pub fn read_json_input(data: Option<String>) -> anyhow::Result<Value> {
    let raw = match data {
        Some(raw) => raw,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("Invalid JSON input: {}", e))
}

/// Parse `key=value` pairs given on the command line.
pub fn parse_field_pairs(pairs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
            _ => Err(anyhow::anyhow!("Expected key=value, got '{}'", pair)),
        })
        .collect()
}
