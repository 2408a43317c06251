//! # Function Registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::errors::{StructuredError, UdtfResult};
use crate::observability::{Event, Logger, MetricsRegistry};

use super::builtin::BUILTINS;
use super::function::{FunctionInfo, TableFunction};
use super::routine::Routine;

/// Registry of table functions, keyed by name
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: RwLock<HashMap<String, TableFunction>>,
    metrics: Arc<MetricsRegistry>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry sharing the given counters
    pub fn with_metrics(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            by_name: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Create a registry holding every built-in under its default return type
    pub fn with_builtins() -> UdtfResult<Self> {
        let registry = Self::new();
        for builtin in BUILTINS.iter() {
            registry.define(builtin.name, builtin.default_return_type, builtin.build)?;
        }
        Ok(registry)
    }

    /// Returns the counters used for registration failures
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Parses the return type and registers the function under `name`
    pub fn define<F>(&self, name: &str, return_type: &str, factory: F) -> UdtfResult<TableFunction>
    where
        F: Fn() -> Routine + Send + Sync + 'static,
    {
        let function = TableFunction::with_metrics(name, return_type, factory, &self.metrics)?;
        self.register(function.clone())?;
        Ok(function)
    }

    /// Register a function
    pub fn register(&self, function: TableFunction) -> UdtfResult<()> {
        let mut by_name = self
            .by_name
            .write()
            .map_err(|_| StructuredError::internal("Lock poisoned"))?;
        if by_name.contains_key(function.name()) {
            return Err(StructuredError::already_exists(function.name()));
        }
        by_name.insert(function.name().to_string(), function);
        Ok(())
    }

    /// Get function by name
    pub fn get(&self, name: &str) -> UdtfResult<TableFunction> {
        let by_name = self
            .by_name
            .read()
            .map_err(|_| StructuredError::internal("Lock poisoned"))?;
        by_name
            .get(name)
            .cloned()
            .ok_or_else(|| StructuredError::not_found(name))
    }

    /// Unregister a function
    pub fn unregister(&self, name: &str) -> UdtfResult<()> {
        let mut by_name = self
            .by_name
            .write()
            .map_err(|_| StructuredError::internal("Lock poisoned"))?;
        by_name
            .remove(name)
            .ok_or_else(|| StructuredError::not_found(name))?;
        Logger::info(Event::Unregistered.as_str(), &[("function", name)]);
        Ok(())
    }

    /// List all functions, ordered by name
    pub fn list(&self) -> Vec<FunctionInfo> {
        let mut infos: Vec<FunctionInfo> = self
            .by_name
            .read()
            .map(|m| m.values().map(TableFunction::info).collect())
            .unwrap_or_default();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Get function count
    pub fn len(&self) -> usize {
        self.by_name.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
