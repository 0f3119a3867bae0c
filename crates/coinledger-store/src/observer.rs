//! Per-operation observation hook.

use std::fmt;
use std::time::Duration;

/// A store operation, as reported to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an empty backing store.
    Initialize,
    /// Read the backing store into memory.
    Load,
    /// Write memory to the backing store.
    Save,
    /// Empty the store.
    Clear,
    /// Copy the backing store to the backup.
    Backup,
    /// Replace the backing store with the backup.
    Restore,
    /// Remove the backing store.
    DeleteStore,
    /// Insert a record.
    Create,
    /// Remove a record by key.
    Delete,
    /// Remove every record matching a field value.
    DeleteByField,
    /// Change fields of a record.
    Update,
    /// Find records by field value.
    Search,
    /// Write a tabular export.
    Export,
}

impl Operation {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Load => "load",
            Self::Save => "save",
            Self::Clear => "clear",
            Self::Backup => "backup",
            Self::Restore => "restore",
            Self::DeleteStore => "delete_store",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::DeleteByField => "delete_by_field",
            Self::Update => "update",
            Self::Search => "search",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an observer is told after each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationEvent {
    /// The operation that ran.
    pub operation: Operation,
    /// Wall time it took.
    pub elapsed: Duration,
    /// Whether it returned `Ok`.
    pub succeeded: bool,
}

/// Receives an event after every store operation.
///
/// Observers see outcomes only; they cannot change them.
pub trait OperationObserver: Send + Sync {
    /// Called once per completed operation.
    fn record(&self, event: &OperationEvent);
}

/// Observer that logs each operation's timing through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn record(&self, event: &OperationEvent) {
        tracing::debug!(
            operation = %event.operation,
            elapsed_us = u64::try_from(event.elapsed.as_micros()).unwrap_or(u64::MAX),
            succeeded = event.succeeded,
            "Store operation finished"
        );
    }
}

impl<F> OperationObserver for F
where
    F: Fn(&OperationEvent) + Send + Sync,
{
    fn record(&self, event: &OperationEvent) {
        self(event);
    }
}
