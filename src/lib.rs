//! coc-codemod: diagnostic-driven migration of coc.nvim extensions
//!
//! Rewrites call sites of the deprecated coc.nvim API by reading semantic
//! diagnostics from `tsserver` and matching them against a fixed catalogue of
//! rules.
//!
//! # Architecture
//!
//! - [`position`] converts tsserver byte columns into character indices.
//! - [`rules`] maps one diagnostic plus its source line to at most one edit.
//!   One rule defers its decision to a type query ([`rules::TypeCheck`]).
//! - [`compose`] folds the matches of a file into a non-overlapping
//!   [`FixPlan`], adding the `window` import once when needed.
//! - [`session`] drives one file at a time: diagnostics, rules, compose,
//!   atomic apply, then import cleanup.
//!
//! The language service and the file system sit behind the
//! [`DiagnosticSource`] and [`DocumentStore`] traits. [`tsserver::TsServer`]
//! and [`document::DiskDocuments`] are the production implementations.
//!
//! # Safety
//!
//! - Every batch is validated for overlap before anything is written
//! - Writes are atomic (tempfile + fsync + rename)
//! - A batch is refused if the file changed since its diagnostics were read
//! - Files under `node_modules` or outside the workspace are never written
//!
//! # Example
//!
//! ```
//! use coc_codemod::compose::compose;
//! use coc_codemod::diagnostic::{Diagnostic, Location};
//! use coc_codemod::rules::{evaluate, RuleOutcome};
//!
//! let line = "workspace.showMessage('x')";
//! let diag = Diagnostic::new(
//!     "Property 'showMessage' does not exist on type 'typeof workspace'.",
//!     Location::new(1, 11),
//! );
//! let RuleOutcome::Matched(m) = evaluate(&diag, line) else { unreachable!() };
//! let plan = compose([m]);
//! assert_eq!(
//!     plan.apply_to(line).unwrap(),
//!     "import {window} from 'coc.nvim'\nwindow.showMessage('x')"
//! );
//! ```

pub mod compose;
pub mod config;
pub mod diagnostic;
pub mod discover;
pub mod document;
pub mod edit;
pub mod position;
pub mod rules;
pub mod safety;
pub mod session;
pub mod telemetry;
pub mod tsserver;

// Re-exports
pub use compose::{compose, FixPlan};
pub use config::{load_from_path, load_from_str, load_workspace, CodemodConfig, ConfigError};
pub use diagnostic::{CancelToken, Diagnostic, DiagnosticSource, Location, SourceError, TypeInfo};
pub use discover::discover_files;
pub use document::{DiskDocuments, Document, DocumentError, DocumentStore};
pub use edit::{EditError, Position, Range, TextEdit};
pub use rules::{evaluate, RuleId, RuleMatch, RuleOutcome, TypeCheck, CATALOGUE};
pub use safety::{SafetyError, WorkspaceGuard};
pub use session::{FileFixSession, FileOutcome, FixError, SessionOptions};
