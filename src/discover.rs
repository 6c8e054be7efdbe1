//! Candidate file discovery.
//!
//! Walks the workspace for source files that import the migrated package.
//! Excluded directories are pruned during the walk rather than filtered out
//! afterwards, so large dependency trees are never traversed.

use crate::config::DiscoveryConfig;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

fn is_excluded(entry: &DirEntry, config: &DiscoveryConfig) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| config.exclude.iter().any(|ex| ex == name))
}

fn has_extension(path: &Path, config: &DiscoveryConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config.extensions.iter().any(|want| want == ext))
}

/// Whether any line of `path` contains one of the import markers.
///
/// Lines are decoded lossily, so stray invalid UTF-8 does not hide a marker.
/// Unreadable files do not qualify.
pub fn imports_marker(path: &Path, markers: &[String]) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        let line = String::from_utf8_lossy(&buf);
        if markers.iter().any(|marker| line.contains(marker.as_str())) {
            return true;
        }
    }
}

/// Sorted absolute paths of the files a fix run should visit.
pub fn discover_files(workspace: &Path, config: &DiscoveryConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(workspace)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry, config))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), config))
        .filter(|entry| imports_marker(entry.path(), &config.markers))
        .map(DirEntry::into_path)
        .collect();

    files.sort();
    debug!(count = files.len(), "discovered candidate files");
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_discover_filters_by_marker_extension_and_exclude() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let a = write(root, "src/index.ts", "import { workspace } from 'coc.nvim'\n");
        let b = write(root, "src/util/list.ts", "import {window} from \"coc.nvim\"\n");
        write(root, "src/plain.ts", "export const x = 1\n");
        write(root, "src/index.js", "import { workspace } from 'coc.nvim'\n");
        write(
            root,
            "node_modules/coc.nvim/index.ts",
            "import { workspace } from 'coc.nvim'\n",
        );

        let files = discover_files(root, &DiscoveryConfig::default());
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn test_marker_must_match_quotes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "a.ts", "const name = 'coc.nvim'\n");
        assert!(!imports_marker(&path, &DiscoveryConfig::default().markers));
    }

    #[test]
    fn test_binary_file_without_marker_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bin.ts");
        fs::write(&path, [0xff, 0xfe, b'\n']).unwrap();
        assert!(!imports_marker(&path, &DiscoveryConfig::default().markers));
    }

    #[test]
    fn test_invalid_utf8_before_marker() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("latin1.ts");
        let mut content = b"// caf\xe9\n".to_vec();
        content.extend_from_slice(b"import { workspace } from 'coc.nvim'\n");
        fs::write(&path, content).unwrap();
        assert!(imports_marker(&path, &DiscoveryConfig::default().markers));
    }
}
