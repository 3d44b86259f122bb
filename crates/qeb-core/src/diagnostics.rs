//! Injectable diagnostic output
//!
//! Every warning or debug message produced while fitting goes through a
//! [`DiagnosticSink`] instead of a global logger. The default sink forwards
//! to `tracing`; tests swap in a [`CollectingSink`] to inspect what was
//! reported.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// A single diagnostic message
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Receiver for diagnostics emitted during an analysis
pub trait DiagnosticSink: Send + Sync {
    /// Handle one diagnostic record
    fn emit(&self, diagnostic: Diagnostic);

    fn debug(&self, message: &str) {
        self.emit(Diagnostic::new(Severity::Debug, message));
    }

    fn info(&self, message: &str) {
        self.emit(Diagnostic::new(Severity::Info, message));
    }

    fn warning(&self, message: &str) {
        self.emit(Diagnostic::new(Severity::Warning, message));
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}

/// Forwards diagnostics to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Debug => tracing::debug!("{}", diagnostic.message),
            Severity::Info => tracing::info!("{}", diagnostic.message),
            Severity::Warning => tracing::warn!("{}", diagnostic.message),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records received so far
    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages of the warning-level records
    pub fn warnings(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message)
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        self.records()
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    pub fn clear(&self) {
        match self.records.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

/// Shared handle to a sink, as stored by the analysis types
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// The default sink used when the caller injects none
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
