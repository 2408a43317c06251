//! Row schema type definitions
//!
//! Supported field types:
//! - boolean: Boolean
//! - int: 32-bit signed integer
//! - bigint: 64-bit signed integer
//! - float: 32-bit floating point
//! - double: 64-bit floating point
//! - string: UTF-8 string
//!
//! Matching between a row and its schema is positional. Field names are
//! carried for display and for the columnar block's column names only.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A produced (or input) row: an ordered sequence of values.
pub type Row = Vec<Value>;

/// Shared, read-only schema handle.
pub type SchemaRef = Arc<RowSchema>;

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Boolean
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    String,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Int => "int",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
        }
    }

    /// Resolves a type name (case-insensitive, with common aliases).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(FieldType::Boolean),
            "int" | "integer" => Some(FieldType::Int),
            "bigint" | "long" => Some(FieldType::BigInt),
            "float" | "real" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "string" => Some(FieldType::String),
            _ => None,
        }
    }

    /// Arrow data type used by the columnar encoder
    pub fn arrow_type(&self) -> DataType {
        match self {
            FieldType::Boolean => DataType::Boolean,
            FieldType::Int => DataType::Int32,
            FieldType::BigInt => DataType::Int64,
            FieldType::Float => DataType::Float32,
            FieldType::Double => DataType::Float64,
            FieldType::String => DataType::Utf8,
        }
    }

    /// Returns true if a non-null value can be stored in a field of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Boolean => value.is_boolean(),
            FieldType::Int => value
                .as_i64()
                .map_or(false, |v| i32::try_from(v).is_ok()),
            FieldType::BigInt => value.is_i64(),
            FieldType::Float => value
                .as_f64()
                .map_or(false, |v| (v as f32).is_finite()),
            FieldType::Double => value.is_number(),
            FieldType::String => value.is_string(),
        }
    }

    /// Converts an accepted value into its canonical representation.
    ///
    /// Floats are narrowed to 32 bits so that row-wise and columnar output
    /// carry the same logical value. Returns `None` if the value is not
    /// accepted by this type.
    pub fn canonicalize(&self, value: Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        if !self.accepts(&value) {
            return None;
        }
        match self {
            FieldType::Float => {
                let narrowed = value.as_f64()? as f32;
                serde_json::Number::from_f64(f64::from(narrowed)).map(Value::Number)
            }
            FieldType::Double => {
                let wide = value.as_f64()?;
                serde_json::Number::from_f64(wide).map(Value::Number)
            }
            _ => Some(value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// One positional field of a row schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name (not required to be unique)
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
    /// Whether null values are allowed
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    /// Create a nullable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Create a field that rejects nulls
    pub fn not_null(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.field_type)?;
        if !self.nullable {
            write!(f, " not null")?;
        }
        Ok(())
    }
}

/// The declared output shape of a table function.
///
/// Immutable once built; shared read-only by every execution context of a
/// query through [`SchemaRef`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowSchema {
    fields: Vec<Field>,
}

impl RowSchema {
    /// Create a schema from ordered fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Returns the ordered fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field at a position
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Wraps the schema into a shared handle
    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }

    /// Arrow schema for the columnar encoder
    pub fn to_arrow(&self) -> ArrowSchema {
        let fields: Vec<ArrowField> = self
            .fields
            .iter()
            .map(|f| ArrowField::new(f.name.clone(), f.field_type.arrow_type(), f.nullable))
            .collect();
        ArrowSchema::new(fields)
    }
}

impl fmt::Display for RowSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "struct<")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names_round_trip() {
        for ty in [
            FieldType::Boolean,
            FieldType::Int,
            FieldType::BigInt,
            FieldType::Float,
            FieldType::Double,
            FieldType::String,
        ] {
            assert_eq!(FieldType::from_name(ty.type_name()), Some(ty));
        }
        assert_eq!(FieldType::from_name("INTEGER"), Some(FieldType::Int));
        assert_eq!(FieldType::from_name("Long"), Some(FieldType::BigInt));
        assert_eq!(FieldType::from_name("decimal"), None);
    }

    #[test]
    fn test_int_range() {
        assert!(FieldType::Int.accepts(&json!(i32::MAX)));
        assert!(!FieldType::Int.accepts(&json!(i64::from(i32::MAX) + 1)));
        assert!(FieldType::BigInt.accepts(&json!(i64::from(i32::MAX) + 1)));
        assert!(!FieldType::Int.accepts(&json!(1.5)));
        assert!(!FieldType::Int.accepts(&json!(true)));
    }

    #[test]
    fn test_float_accepts_integers() {
        assert!(FieldType::Double.accepts(&json!(3)));
        assert!(FieldType::Float.accepts(&json!(2.5)));
        assert!(!FieldType::Double.accepts(&json!("2.5")));
    }

    #[test]
    fn test_canonicalize_float_narrows() {
        let v = FieldType::Float.canonicalize(json!(0.1)).unwrap();
        assert_eq!(v.as_f64().unwrap(), f64::from(0.1_f32));
        assert_eq!(FieldType::Int.canonicalize(json!("x")), None);
        assert_eq!(FieldType::String.canonicalize(Value::Null), Some(Value::Null));
    }

    #[test]
    fn test_schema_display() {
        let schema = RowSchema::new(vec![
            Field::new("a", FieldType::Int),
            Field::not_null("b", FieldType::String),
        ]);
        assert_eq!(schema.to_string(), "struct<a: int, b: string not null>");
        assert_eq!(schema.field_count(), 2);
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let schema = RowSchema::new(vec![
            Field::new("x", FieldType::Int),
            Field::new("x", FieldType::Int),
        ]);
        assert_eq!(schema.to_arrow().fields().len(), 2);
    }
}
