//! Output row validation
//!
//! Validation semantics:
//! - Arity is checked first; a row must carry exactly one value per field
//! - Each value must be storable in its positional field's declared type
//! - Null is only allowed in nullable fields
//!
//! Validation is pure and deterministic. It never mutates the row.

use std::fmt;

use serde_json::Value;

use super::types::{FieldType, Row, SchemaRef};

/// Result of checking one produced row against the schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Row matches the declared schema
    Conforms,
    /// Row value count differs from the schema field count
    ArityMismatch { expected: usize, actual: usize },
    /// A value cannot be stored in its positional field
    TypeMismatch {
        index: usize,
        declared: FieldType,
        actual: &'static str,
    },
}

impl ValidationOutcome {
    /// Returns true if the row conforms
    pub fn is_conforming(&self) -> bool {
        matches!(self, ValidationOutcome::Conforms)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationOutcome::Conforms => write!(f, "conforms"),
            ValidationOutcome::ArityMismatch { expected, actual } => {
                write!(f, "arity mismatch: expected {}, got {}", expected, actual)
            }
            ValidationOutcome::TypeMismatch {
                index,
                declared,
                actual,
            } => write!(
                f,
                "type mismatch at position {}: expected {}, got {}",
                index, declared, actual
            ),
        }
    }
}

/// Validates produced rows against one shared schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: SchemaRef,
}

impl SchemaValidator {
    /// Creates a validator for the given schema.
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }

    /// Returns the schema rows are checked against
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Validates a row.
    pub fn validate(&self, row: &Row) -> ValidationOutcome {
        let expected = self.schema.field_count();
        if row.len() != expected {
            return ValidationOutcome::ArityMismatch {
                expected,
                actual: row.len(),
            };
        }

        for (index, (value, field)) in row.iter().zip(self.schema.fields()).enumerate() {
            let ok = if value.is_null() {
                field.nullable
            } else {
                field.field_type.accepts(value)
            };
            if !ok {
                return ValidationOutcome::TypeMismatch {
                    index,
                    declared: field.field_type,
                    actual: json_type_name(value),
                };
            }
        }

        ValidationOutcome::Conforms
    }
}

/// Returns a JSON type name for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
