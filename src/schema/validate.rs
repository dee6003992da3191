use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use super::{AutoField, EntitySchema, FieldDef, FieldDefault, FieldType, Row};
use crate::storage::UPLOADS_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Defaults and server-assigned columns are filled in.
    Create,
    /// Every writable column is overwritten; absent keys become null,
    /// except the attachment column which keeps its stored path.
    Replace,
}

/// Every field that failed validation, keyed by field name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.insert(field.to_string(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|(_, msg)| msg.as_str() == REQUIRED)
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() && missing.len() == self.fields.len() {
            return write!(f, "Missing required fields: {}", missing.join(", "));
        }
        let parts: Vec<String> = self.fields.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
        write!(f, "Invalid fields: {}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

const REQUIRED: &str = "is required";

/// Server timestamps look like `2024-05-01T10:30:00.000Z`.
pub fn timestamp_now(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl EntitySchema {
    /// Turn an untyped request body into the column map handed to storage.
    ///
    /// Unknown keys and server-assigned columns in the body are ignored.
    /// Stored upload paths can only be set by the multipart handler.
    pub fn validate(&self, body: &Value, mode: WriteMode, now: DateTime<Utc>) -> Result<Row, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let Some(input) = body.as_object() else {
            errors.add("body", "must be a JSON object");
            return Err(errors);
        };

        let mut row = Row::new();
        for field in &self.fields {
            if let Some(AutoField::Created) = field.auto {
                if mode == WriteMode::Create {
                    row.insert(field.name.clone(), Value::String(timestamp_now(now)));
                }
                continue;
            }

            let is_attachment = self.attachment.as_ref().is_some_and(|a| a.field == field.name);
            if is_attachment && mode == WriteMode::Replace && !input.contains_key(&field.name) {
                continue;
            }

            let value = match input.get(&field.name) {
                Some(raw) if is_attachment && is_upload_path(raw) => {
                    errors.add(&field.name, "cannot reference a stored upload");
                    continue;
                }
                Some(raw) => match coerce(field, raw) {
                    Ok(v) => v,
                    Err(msg) => {
                        errors.add(&field.name, msg);
                        continue;
                    }
                },
                None => Value::Null,
            };

            let value = if value.is_null() && mode == WriteMode::Create {
                match &field.default {
                    Some(FieldDefault::Now) => Value::String(timestamp_now(now)),
                    Some(FieldDefault::Value(v)) => v.clone(),
                    None => value,
                }
            } else {
                value
            };

            if field.required && is_blank(&value) {
                errors.add(&field.name, REQUIRED);
                continue;
            }
            row.insert(field.name.clone(), value);
        }

        if errors.is_empty() {
            Ok(row)
        } else {
            Err(errors)
        }
    }

    /// Serialise json and list columns to text for storage.
    pub fn encode_row(&self, mut row: Row) -> Row {
        for field in self.fields.iter().filter(|f| f.ty.is_serialized()) {
            if let Some(value) = row.get_mut(&field.name) {
                if !value.is_null() && !value.is_string() {
                    *value = Value::String(value.to_string());
                }
            }
        }
        row
    }

    /// Inverse of [`encode_row`](Self::encode_row), applied to every row read back.
    pub fn decode_row(&self, mut row: Row) -> Row {
        for field in self.fields.iter().filter(|f| f.ty.is_serialized()) {
            let Some(value) = row.get_mut(&field.name) else { continue };
            let decoded = match value.take() {
                Value::String(s) => match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ (Value::Array(_) | Value::Object(_))) => parsed,
                    _ if field.ty == FieldType::List => split_list(&s),
                    _ => Value::String(s),
                },
                Value::Null => empty_of(field.ty),
                other => other,
            };
            *value = decoded;
        }
        row
    }
}

fn empty_of(ty: FieldType) -> Value {
    match ty {
        FieldType::List => Value::Array(Vec::new()),
        FieldType::Json => Value::Object(Default::default()),
        _ => Value::Null,
    }
}

fn is_upload_path(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.trim_start().starts_with(UPLOADS_PREFIX))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(field: &FieldDef, raw: &Value) -> Result<Value, String> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    // Form inputs submit empty strings for untouched typed fields.
    if field.ty != FieldType::Text {
        if let Value::String(s) = raw {
            if s.trim().is_empty() {
                return Ok(Value::Null);
            }
        }
    }

    match field.ty {
        FieldType::Text => match raw {
            Value::String(_) => Ok(raw.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err("must be a string".to_string()),
        },
        FieldType::Integer => match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::from(i)),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
                    _ => Err("must be an integer".to_string()),
                },
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| "must be an integer".to_string()),
            _ => Err("must be an integer".to_string()),
        },
        FieldType::Decimal => match raw {
            Value::Number(_) => Ok(raw.clone()),
            Value::String(s) => s
                .trim()
                .parse::<Number>()
                .map(Value::Number)
                .map_err(|_| "must be a number".to_string()),
            _ => Err("must be a number".to_string()),
        },
        FieldType::Boolean => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err("must be a boolean".to_string()),
            },
            _ => Err("must be a boolean".to_string()),
        },
        FieldType::Timestamp => match raw {
            Value::String(s) if is_timestamp(s.trim()) => Ok(Value::String(s.trim().to_string())),
            _ => Err("must be an ISO-8601 date or datetime".to_string()),
        },
        FieldType::Json => match raw {
            Value::Object(_) | Value::Array(_) => Ok(raw.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(v @ (Value::Object(_) | Value::Array(_))) => Ok(v),
                _ => Err("must be a JSON object or array".to_string()),
            },
            _ => Err("must be a JSON object or array".to_string()),
        },
        FieldType::List => match raw {
            Value::Array(_) => Ok(raw.clone()),
            Value::String(s) if s.trim_start().starts_with('[') => match serde_json::from_str::<Value>(s) {
                Ok(v @ Value::Array(_)) => Ok(v),
                _ => Err("must be a list".to_string()),
            },
            Value::String(s) => Ok(split_list(s)),
            _ => Err("must be a list".to_string()),
        },
    }
}

fn split_list(s: &str) -> Value {
    Value::Array(
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Value::String(p.to_string()))
            .collect(),
    )
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
