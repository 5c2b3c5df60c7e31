//! Pipeline manager
//!
//! An explicitly passed context object, not a process-wide singleton:
//! callers thread it through every run. It holds the named table
//! snapshots published by `notify` (read back by `join`) and the
//! result/error of the most recent run.
//!
//! Lifecycle: empty at process start; `register` inserts or overwrites;
//! `reset` clears everything. Callers MUST reset between independent
//! run cycles; a skipped reset leaks registrations into the next cycle.
//! That leak is documented behavior, not something the engine hides.

use indexmap::IndexMap;

use crate::transform::{TransformError, TransformResult};
use crate::value::Table;

/// Registry of named table snapshots plus last-run state.
#[derive(Debug, Clone, Default)]
pub struct PipelineManager {
    tables: IndexMap<String, Table>,
    last_error: String,
    last_result: Option<Table>,
}

impl PipelineManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a table under a name, overwriting any previous entry.
    pub fn register(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    /// Looks up a published table by name.
    pub fn lookup(&self, name: &str) -> TransformResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| TransformError::UnknownRegistryName(name.to_string()))
    }

    /// Returns true if a table is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.tables.keys()
    }

    /// Records a successful run.
    pub(crate) fn record_success(&mut self, table: &Table) {
        self.last_error.clear();
        self.last_result = Some(table.clone());
    }

    /// Records a failed run. Registrations made earlier in the run stay.
    pub(crate) fn record_failure(&mut self, error: String) {
        self.last_error = error;
        self.last_result = None;
    }

    /// The most recent run's error string; empty on success.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// The most recent successful run's table, if any.
    pub fn last_result(&self) -> Option<&Table> {
        self.last_result.as_ref()
    }

    /// Clears all registrations and stored run state.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.last_error.clear();
        self.last_result = None;
    }
}
