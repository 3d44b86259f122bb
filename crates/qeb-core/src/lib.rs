//! Core types shared by the quantum error bars crates
//!
//! This crate holds the pieces every other crate in the workspace depends
//! on: the unified [`Error`] type and the [`DiagnosticSink`] abstraction used
//! to report warnings without a global logger.
//!
//! # Example
//!
//! ```rust
//! use qeb_core::{CollectingSink, DiagnosticSink, Error};
//!
//! let sink = CollectingSink::new();
//! sink.warning("fit may be poor");
//! assert_eq!(sink.warnings().len(), 1);
//!
//! let err = Error::invalid_scale(2.0);
//! assert!(err.is_configuration());
//! ```

pub mod diagnostics;
pub mod error;

pub use diagnostics::{
    default_sink, CollectingSink, Diagnostic, DiagnosticSink, NullSink, Severity, SharedSink,
    TracingSink,
};
pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::diagnostics::{DiagnosticSink, SharedSink};
    pub use crate::error::{Error, Result};
}
