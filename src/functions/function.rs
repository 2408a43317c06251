//! # Table Function Definition
//!
//! Registration binds a name, a declared return type and a routine factory.
//! The return type is parsed here, so a malformed declaration fails before
//! any routine is instantiated or any row is requested.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{ErrorChannel, Failure, UdtfResult};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::schema::{parse_return_type, SchemaRef};

use super::routine::{Routine, RoutineFactory};

/// A registered table function
#[derive(Clone)]
pub struct TableFunction {
    id: Uuid,
    name: String,
    return_type: String,
    schema: SchemaRef,
    factory: RoutineFactory,
    created_at: DateTime<Utc>,
}

impl TableFunction {
    /// Registers a function, parsing its declared return type.
    pub fn new<F>(name: impl Into<String>, return_type: &str, factory: F) -> UdtfResult<Self>
    where
        F: Fn() -> Routine + Send + Sync + 'static,
    {
        Self::with_metrics(name, return_type, factory, &Arc::new(MetricsRegistry::new()))
    }

    /// Registers a function, counting rejected declarations in `metrics`.
    pub fn with_metrics<F>(
        name: impl Into<String>,
        return_type: &str,
        factory: F,
        metrics: &Arc<MetricsRegistry>,
    ) -> UdtfResult<Self>
    where
        F: Fn() -> Routine + Send + Sync + 'static,
    {
        let name = name.into();
        let schema = parse_return_type(return_type).map_err(|reason| {
            ErrorChannel::new(name.clone(), Arc::clone(metrics))
                .report(Failure::InvalidReturnType(reason))
        })?;

        let field_count = schema.field_count().to_string();
        Logger::info(
            Event::Registered.as_str(),
            &[
                ("fields", field_count.as_str()),
                ("function", name.as_str()),
                ("return_type", return_type),
            ],
        );

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            return_type: return_type.trim().to_string(),
            schema: schema.into_ref(),
            factory: Arc::new(factory),
            created_at: Utc::now(),
        })
    }

    /// Function ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type, as given at registration
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Parsed output schema
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Creates a fresh routine instance
    pub fn instantiate(&self) -> Routine {
        (self.factory)()
    }

    /// Serializable summary
    pub fn info(&self) -> FunctionInfo {
        FunctionInfo {
            id: self.id,
            name: self.name.clone(),
            return_type: self.schema.to_string(),
            field_count: self.schema.field_count(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for TableFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFunction")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Summary of a registered function
#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub id: Uuid,
    pub name: String,
    pub return_type: String,
    pub field_count: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::functions::builtin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_registration_parses_schema() {
        let func = TableFunction::new("explode", "col: int", builtin::explode).unwrap();
        assert_eq!(func.name(), "explode");
        assert_eq!(func.schema().field_count(), 1);
        assert_eq!(func.info().return_type, "struct<col: int>");
    }

    #[test]
    fn test_invalid_return_type_never_instantiates() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let err = TableFunction::new("bad", "int", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            builtin::explode()
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidReturnType);
        assert_eq!(err.function(), Some("bad"));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_instances_are_independent() {
        let func = TableFunction::new("row_count", "count: bigint", builtin::row_count).unwrap();
        let mut a = func.instantiate();
        let b = func.instantiate();
        assert_eq!(a.eval(vec![]).count(), 0);
        assert!(b.has_terminate());
    }
}
