use std::collections::HashMap;

use base64::Engine;
use chrono::{Datelike, NaiveDateTime};
use serde_json::Number;
use tracing::debug;

use crate::data_types::{is_text_category, AbstractColumnType};

/// A single decoded value of a result row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    /// Canonical (compact, keys sorted) JSON document text
    Json(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

/// A result row, keyed by column name
pub type Row = HashMap<String, Value>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// Postgres prints `infinity`/`-infinity` for the special values and a ` BC` suffix for
// years before 1 AD (year 1 BC is year 0 in ISO numbering).
fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    match text {
        "infinity" => return Ok(NaiveDateTime::MAX),
        "-infinity" => return Ok(NaiveDateTime::MIN),
        _ => {}
    }

    let (text, bc) = match text.strip_suffix(" BC") {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let ts = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp {text:?}: {e}"))?;

    if bc {
        ts.with_year(1 - ts.year())
            .ok_or_else(|| format!("timestamp {text:?} BC is out of range"))
    } else {
        Ok(ts)
    }
}

impl Value {
    /// Decode the text representation of a non-NULL value of the given native type
    pub fn decode_text(native_db_type: &str, text: &str) -> Result<Self, String> {
        let value = match AbstractColumnType::from_native(native_db_type) {
            AbstractColumnType::String | AbstractColumnType::Inet | AbstractColumnType::Cidr => {
                Self::Text(text.to_string())
            }
            AbstractColumnType::Bool => match text {
                "t" | "true" => Self::Bool(true),
                "f" | "false" => Self::Bool(false),
                _ => return Err(format!("invalid boolean {text:?}")),
            },
            AbstractColumnType::Int => Self::Int(
                text.parse()
                    .map_err(|e| format!("invalid integer {text:?}: {e}"))?,
            ),
            AbstractColumnType::Double => Self::Double(
                text.parse()
                    .map_err(|e| format!("invalid number {text:?}: {e}"))?,
            ),
            AbstractColumnType::Timestamp => Self::Timestamp(parse_timestamp(text)?),
            AbstractColumnType::Json => Self::Bytes(text.as_bytes().to_vec()),
            AbstractColumnType::Unknown if native_db_type == "BYTEA" => {
                let digits = text
                    .strip_prefix("\\x")
                    .ok_or_else(|| format!("unexpected bytea encoding {text:?}"))?;
                Self::Bytes(
                    hex::decode(digits).map_err(|e| format!("invalid bytea: {e}"))?,
                )
            }
            AbstractColumnType::Unknown if is_text_category(native_db_type) => {
                Self::Text(text.to_string())
            }
            AbstractColumnType::Unknown => Self::Bytes(text.as_bytes().to_vec()),
        };

        Ok(value)
    }

    /// Replace raw bytes holding a valid JSON document with its canonical text.
    ///
    /// Anything else, including bytes that aren't JSON, is passed through untouched.
    pub fn detect_json(self) -> Self {
        match self {
            Self::Bytes(bytes) => match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(doc) => Self::Json(doc.to_string()),
                Err(e) => {
                    debug!("Value is not a JSON document: {e}");
                    Self::Bytes(bytes)
                }
            },
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Representation used when a row is rendered as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Double(d) => Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Json(s) => serde_json::from_str(s)
                .unwrap_or_else(|_| serde_json::Value::String(s.clone())),
            Self::Timestamp(ts) => serde_json::Value::String(ts.to_string()),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => serde_json::Value::String(s.to_string()),
                Err(_) => serde_json::Value::String(
                    base64::engine::general_purpose::STANDARD.encode(bytes),
                ),
            },
        }
    }
}

/// Render a whole row as a JSON object
pub fn row_to_json(row: &Row) -> serde_json::Value {
    serde_json::Value::Object(
        row.iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}
