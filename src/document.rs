//! Document snapshots and the store that loads and rewrites them.

use crate::edit::{apply_batch, atomic_write, line_of, EditError, TextEdit};
use crate::safety::{SafetyError, WorkspaceGuard};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Immutable text of one file at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
    hash: u64,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = xxh3_64(text.as_bytes());
        Self {
            path: path.into(),
            text,
            hash,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Line `index` (0-based) without its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        line_of(&self.text, index)
    }

    /// Whether `current` is still the text this snapshot was taken from.
    pub fn matches(&self, current: &str) -> bool {
        xxh3_64(current.as_bytes()) == self.hash
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    #[error("Refusing to write: {0}")]
    Safety(#[from] SafetyError),
}

/// Where documents are read from and edit batches are written to.
pub trait DocumentStore {
    /// Take a snapshot of `file`.
    fn load(&mut self, file: &Path) -> Result<Document, DocumentError>;

    /// Apply `edits` to the file behind `document`, all or nothing.
    ///
    /// Fails without touching the file if it changed since `document` was
    /// loaded. Returns the new snapshot.
    fn apply(&mut self, document: &Document, edits: &[TextEdit]) -> Result<Document, DocumentError>;
}

/// Documents backed by the file system.
///
/// In dry-run mode rewritten text is kept in memory and later loads see it,
/// so a whole run can be previewed without touching disk.
#[derive(Debug)]
pub struct DiskDocuments {
    guard: WorkspaceGuard,
    dry_run: bool,
    overlay: BTreeMap<PathBuf, String>,
}

impl DiskDocuments {
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            guard: WorkspaceGuard::new(workspace)?,
            dry_run: false,
            overlay: BTreeMap::new(),
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Text rewritten in dry-run mode, by path.
    pub fn pending(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.overlay
            .iter()
            .map(|(path, text)| (path.as_path(), text.as_str()))
    }

    fn read(&self, file: &Path) -> Result<String, DocumentError> {
        if let Some(text) = self.overlay.get(file) {
            return Ok(text.clone());
        }
        fs::read_to_string(file).map_err(|source| DocumentError::Read {
            path: file.to_path_buf(),
            source,
        })
    }
}

impl DocumentStore for DiskDocuments {
    fn load(&mut self, file: &Path) -> Result<Document, DocumentError> {
        let text = self.read(file)?;
        Ok(Document::new(file, text))
    }

    fn apply(&mut self, document: &Document, edits: &[TextEdit]) -> Result<Document, DocumentError> {
        let path = document.path();
        let current = self.read(path)?;
        if !document.matches(&current) {
            return Err(EditError::StaleSnapshot(path.to_path_buf()).into());
        }

        let updated = apply_batch(&current, edits)?;
        if self.dry_run {
            debug!(file = %path.display(), edits = edits.len(), "dry run: keeping edits in memory");
            self.overlay.insert(path.to_path_buf(), updated.clone());
        } else {
            let target = self.guard.validate_path(path)?;
            atomic_write(&target, updated.as_bytes())?;
        }
        Ok(Document::new(path, updated))
    }
}
