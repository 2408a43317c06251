//! Row schema subsystem
//!
//! A table function declares its output shape once, at registration time.
//! Every produced row is checked against that shape before it is encoded.
//!
//! # Design Principles
//!
//! - Positional matching; names are informational
//! - Malformed declarations are rejected before any row flows
//! - Validation is pure and runs on every row, in every phase

mod parser;
mod types;
mod validator;

pub use parser::{parse_return_type, ReturnTypeError};
pub use types::{Field, FieldType, Row, RowSchema, SchemaRef};
pub use validator::{json_type_name, SchemaValidator, ValidationOutcome};
