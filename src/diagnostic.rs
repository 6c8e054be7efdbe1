//! Diagnostic types and the seam to the service that produces them.
//!
//! The engine never talks to a language service directly; it goes through
//! [`DiagnosticSource`], which the tsserver client implements and tests fake.

use crate::edit::TextEdit;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// A 1-based line and 1-based byte column, as reported by tsserver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub offset: usize,
}

impl Location {
    pub const fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }

    /// 0-based line index, or `None` for a zero line number.
    pub fn line_index(&self) -> Option<usize> {
        self.line.checked_sub(1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.offset)
    }
}

/// A semantic finding for one file at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable message
    pub message: String,
    /// Start of the diagnosed span
    pub start: Location,
    /// Service-specific error code (e.g. 2339)
    pub code: Option<u32>,
    /// Severity category ("error", "warning", ...)
    pub category: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, start: Location) -> Self {
        Self {
            message: message.into(),
            start,
            code: None,
            category: None,
        }
    }
}

/// Result of a type-information query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub display_type: String,
}

impl TypeInfo {
    pub fn new(display_type: impl Into<String>) -> Self {
        Self {
            display_type: display_type.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Failed to start diagnostic service `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Diagnostic service exited unexpectedly")]
    Disconnected,

    #[error("Request `{command}` failed: {message}")]
    Request { command: String, message: String },

    #[error("Malformed response from diagnostic service: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared cancellation flag for one run.
///
/// Clones observe the same flag. Services check it before every request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has been cancelled.
    pub fn check(&self) -> Result<(), SourceError> {
        if self.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A service that produces diagnostics and answers type queries.
pub trait DiagnosticSource {
    /// Semantic diagnostics for `file`, in service order.
    fn diagnostics(
        &mut self,
        file: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<Diagnostic>, SourceError>;

    /// Static type of the expression at `location`.
    fn type_info(
        &mut self,
        file: &Path,
        location: Location,
        cancel: &CancelToken,
    ) -> Result<TypeInfo, SourceError>;

    /// Tell the service that `file` changed on disk.
    fn reload(&mut self, _file: &Path, _cancel: &CancelToken) -> Result<(), SourceError> {
        Ok(())
    }

    /// Edits that sort and prune the imports of `file`.
    fn organize_imports(
        &mut self,
        _file: &Path,
        _cancel: &CancelToken,
    ) -> Result<Vec<TextEdit>, SourceError> {
        Ok(Vec::new())
    }
}
