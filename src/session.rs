//! Per-file fix pass: diagnostics → rules → composer → apply → cleanup.
//!
//! Files are processed strictly one after another. Diagnostics and the edits
//! derived from them are only valid against the snapshot loaded for that
//! file, so nothing is shared or interleaved between files.

use crate::compose::compose;
use crate::diagnostic::{CancelToken, Diagnostic, DiagnosticSource, SourceError};
use crate::document::{Document, DocumentError, DocumentStore};
use crate::rules::{evaluate, RuleMatch, RuleOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delay between writing a fix and asking for import cleanup.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_millis(30);

/// Result of one successful file pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FileOutcome should be checked"]
pub enum FileOutcome {
    /// Edits were applied
    Fixed { edits: usize, import_added: bool },
    /// No diagnostics matched any rule
    Clean,
    /// Some rules matched but every candidate was rejected by a type check
    Unchanged { rejected: usize },
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Fixed {
                edits,
                import_added: true,
            } => write!(f, "{edits} edit(s), window import added"),
            FileOutcome::Fixed { edits, .. } => write!(f, "{edits} edit(s)"),
            FileOutcome::Clean => write!(f, "nothing to fix"),
            FileOutcome::Unchanged { rejected } => {
                write!(f, "{rejected} candidate(s) rejected by type check")
            }
        }
    }
}

/// Why a file pass failed. The file is left as it was.
#[derive(Error, Debug)]
pub enum FixError {
    #[error("{0}")]
    Document(DocumentError),

    #[error("Diagnostics unavailable: {0}")]
    Source(SourceError),

    #[error("Edits rejected: {0}")]
    Apply(DocumentError),

    #[error("Run cancelled")]
    Cancelled,
}

impl From<SourceError> for FixError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Cancelled => FixError::Cancelled,
            other => FixError::Source(other),
        }
    }
}

/// Knobs for a fix run.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Ask the source for import cleanup after each fixed file
    pub organize_imports: bool,
    /// Pause before the cleanup request
    pub cleanup_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            organize_imports: true,
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
        }
    }
}

/// Drives fix passes over files using one source and one store.
pub struct FileFixSession<'a, S, D> {
    source: &'a mut S,
    store: &'a mut D,
    cancel: CancelToken,
    options: SessionOptions,
}

impl<'a, S: DiagnosticSource, D: DocumentStore> FileFixSession<'a, S, D> {
    pub fn new(source: &'a mut S, store: &'a mut D, cancel: CancelToken) -> Self {
        Self {
            source,
            store,
            cancel,
            options: SessionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one fix pass over `file`.
    pub fn run(&mut self, file: &Path) -> Result<FileOutcome, FixError> {
        info!(file = %file.display(), "fixing file");

        let document = self.store.load(file).map_err(FixError::Document)?;
        let diagnostics = self.source.diagnostics(file, &self.cancel)?;
        if diagnostics.is_empty() {
            return Ok(FileOutcome::Clean);
        }
        info!(count = diagnostics.len(), "semantic diagnostics");

        let (matches, rejected) = self.collect_matches(&document, &diagnostics)?;
        let plan = compose(matches);
        if plan.is_empty() {
            return Ok(if rejected > 0 {
                FileOutcome::Unchanged { rejected }
            } else {
                FileOutcome::Clean
            });
        }

        let updated = self
            .store
            .apply(&document, plan.edits())
            .map_err(FixError::Apply)?;
        info!(
            edits = plan.len(),
            dropped = plan.dropped(),
            import_added = plan.needs_import(),
            "applied fixes"
        );

        if self.options.organize_imports {
            self.cleanup(updated);
        }

        Ok(FileOutcome::Fixed {
            edits: plan.len(),
            import_added: plan.needs_import(),
        })
    }

    /// Run passes over `files` in order, isolating failures per file.
    ///
    /// Stops before the next file once the cancel token fires; the cancelled
    /// file and every file after it report [`FixError::Cancelled`].
    pub fn run_all<P: AsRef<Path>>(
        &mut self,
        files: &[P],
    ) -> Vec<(PathBuf, Result<FileOutcome, FixError>)> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let file = file.as_ref();
            let result = if self.cancel.is_cancelled() {
                Err(FixError::Cancelled)
            } else {
                self.run(file)
            };
            if let Err(e) = &result {
                warn!(file = %file.display(), error = %e, "file left unmodified");
            }
            results.push((file.to_path_buf(), result));
        }
        results
    }

    /// Evaluate every diagnostic, confirming deferred matches inline.
    ///
    /// Returns the accepted matches and the number rejected by type checks.
    fn collect_matches(
        &mut self,
        document: &Document,
        diagnostics: &[Diagnostic],
    ) -> Result<(Vec<RuleMatch>, usize), FixError> {
        let mut matches = Vec::new();
        let mut rejected = 0;

        for diagnostic in diagnostics {
            let Some(line) = diagnostic
                .start
                .line_index()
                .and_then(|index| document.line(index))
            else {
                debug!(location = %diagnostic.start, "diagnostic outside document");
                continue;
            };

            match evaluate(diagnostic, line) {
                RuleOutcome::NoMatch => {}
                RuleOutcome::Matched(m) => {
                    debug!(rule = %m.rule, location = %diagnostic.start, "rule matched");
                    matches.push(m);
                }
                RuleOutcome::NeedsTypeCheck(check) => {
                    let info = match self.source.type_info(document.path(), check.location, &self.cancel) {
                        Ok(info) => info,
                        Err(SourceError::Cancelled) => return Err(FixError::Cancelled),
                        Err(e) => {
                            warn!(location = %check.location, error = %e, "type lookup failed");
                            rejected += 1;
                            continue;
                        }
                    };
                    let rule = check.rule;
                    match check.confirm(&info) {
                        Some(m) => {
                            debug!(rule = %rule, display_type = %info.display_type, "type check confirmed");
                            matches.push(m);
                        }
                        None => {
                            debug!(rule = %rule, display_type = %info.display_type, "type check rejected");
                            rejected += 1;
                        }
                    }
                }
            }
        }
        Ok((matches, rejected))
    }

    /// Organize imports after a fix. Failures are logged; the fix stays.
    fn cleanup(&mut self, document: Document) {
        let file = document.path();
        if let Err(e) = self.source.reload(file, &self.cancel) {
            warn!(file = %file.display(), error = %e, "reload after fix failed");
            return;
        }
        thread::sleep(self.options.cleanup_delay);

        let edits = match self.source.organize_imports(file, &self.cancel) {
            Ok(edits) if edits.is_empty() => return,
            Ok(edits) => edits,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "organize imports failed");
                return;
            }
        };
        match self.store.apply(&document, &edits) {
            Ok(_) => {
                if let Err(e) = self.source.reload(file, &self.cancel) {
                    warn!(file = %file.display(), error = %e, "reload after cleanup failed");
                }
            }
            Err(e) => warn!(file = %file.display(), error = %e, "import cleanup rejected"),
        }
    }
}
