//! Return-type parser
//!
//! Accepted forms:
//! - `a: int, b: string`
//! - `a INT NOT NULL, b STRING`
//! - `struct<a: int, b: int>` (and `struct<>` for an empty row)
//!
//! A bare type such as `int` is rejected: a table function always returns
//! rows, so its return type must be a struct.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::types::{Field, FieldType, RowSchema};

/// Why a return-type descriptor could not be turned into a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnTypeError {
    #[error("Expect a struct type, but got {0}.")]
    NotAStruct(String),

    #[error("Return type is empty.")]
    Empty,

    #[error("Cannot parse field definition '{0}'.")]
    MalformedField(String),

    #[error("Unsupported type '{type_name}' for field '{field}'.")]
    UnknownType { field: String, type_name: String },
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:`([^`]+)`|([A-Za-z_][A-Za-z0-9_]*))\s*(?::\s*|\s+)([A-Za-z][A-Za-z0-9_<>]*)\s*(not\s+null)?\s*$",
        )
        .expect("field pattern is a valid regex")
    })
}

/// Parses a return-type descriptor into a row schema.
pub fn parse_return_type(descriptor: &str) -> Result<RowSchema, ReturnTypeError> {
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Err(ReturnTypeError::Empty);
    }

    if let Some(inner) = strip_struct(trimmed) {
        if inner.trim().is_empty() {
            return Ok(RowSchema::default());
        }
        return parse_fields(inner);
    }

    // A single token is a type, not a field list.
    if !trimmed.contains([',', ':', ' ', '\t']) {
        return Err(ReturnTypeError::NotAStruct(trimmed.to_ascii_lowercase()));
    }

    parse_fields(trimmed)
}

fn strip_struct(s: &str) -> Option<&str> {
    let prefix = s.get(..7)?;
    if !prefix.eq_ignore_ascii_case("struct<") || !s.ends_with('>') {
        return None;
    }
    Some(&s[7..s.len() - 1])
}

fn parse_fields(list: &str) -> Result<RowSchema, ReturnTypeError> {
    let mut fields = Vec::new();
    for segment in list.split(',') {
        fields.push(parse_field(segment)?);
    }
    Ok(RowSchema::new(fields))
}

fn parse_field(segment: &str) -> Result<Field, ReturnTypeError> {
    let caps = field_pattern()
        .captures(segment)
        .ok_or_else(|| ReturnTypeError::MalformedField(segment.trim().to_string()))?;

    let name = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReturnTypeError::MalformedField(segment.trim().to_string()))?;
    let type_name = caps.get(3).map_or("", |m| m.as_str());
    let field_type = FieldType::from_name(type_name).ok_or_else(|| ReturnTypeError::UnknownType {
        field: name.clone(),
        type_name: type_name.to_string(),
    })?;

    Ok(Field {
        name,
        field_type,
        nullable: caps.get(4).is_none(),
    })
}
