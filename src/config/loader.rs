//! Workspace resolution and `codemod.toml` loading.

use crate::config::schema::{CodemodConfig, ValidationError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = "codemod.toml";

/// Environment variable naming the workspace when `--workspace` is absent.
pub const WORKSPACE_ENV: &str = "CODEMOD_WORKSPACE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("workspace {} does not exist: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config{}: {source}", origin(.path))]
    Parse {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("invalid config{}:\n{source}", origin(.path))]
    Invalid {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

/// A resolved workspace root together with its configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: CodemodConfig,
}

pub fn load_from_str(input: &str) -> Result<CodemodConfig, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<CodemodConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}

fn parse(input: &str, path: Option<&Path>) -> Result<CodemodConfig, ConfigError> {
    let path = path.map(Path::to_path_buf);
    let config: CodemodConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Parse { path, source }),
    };
    match config.validate() {
        Ok(()) => Ok(config),
        Err(source) => Err(ConfigError::Invalid { path, source }),
    }
}

/// Load `explicit` if given, else `<workspace>/codemod.toml` if present, else
/// the defaults.
pub fn load_for_workspace(
    workspace: &Path,
    explicit: Option<&Path>,
) -> Result<CodemodConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }
    let candidate = workspace.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        debug!(path = %candidate.display(), "using workspace config");
        load_from_path(candidate)
    } else {
        Ok(CodemodConfig::default())
    }
}

/// Canonical workspace root.
///
/// Priority order:
/// 1. `explicit` (the `--workspace` flag)
/// 2. `CODEMOD_WORKSPACE`, when it names an existing path
/// 3. the current directory
pub fn resolve_workspace(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let from_env = env::var_os(WORKSPACE_ENV).map(PathBuf::from);
    let cwd = env::current_dir().map_err(|source| ConfigError::Workspace {
        path: PathBuf::from("."),
        source,
    })?;
    pick_workspace(explicit, from_env.as_deref(), &cwd)
}

fn pick_workspace(
    explicit: Option<&Path>,
    from_env: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf, ConfigError> {
    let chosen = match (explicit, from_env) {
        (Some(path), _) => path,
        (None, Some(path)) if path.exists() => path,
        (None, Some(path)) => {
            warn!(
                path = %path.display(),
                "CODEMOD_WORKSPACE names a missing path, using the current directory"
            );
            cwd
        }
        (None, None) => cwd,
    };
    chosen.canonicalize().map_err(|source| ConfigError::Workspace {
        path: chosen.to_path_buf(),
        source,
    })
}

/// Resolve the workspace root and load its configuration in one step.
pub fn load_workspace(
    workspace: Option<&Path>,
    config: Option<&Path>,
) -> Result<Workspace, ConfigError> {
    let root = resolve_workspace(workspace)?;
    let config = load_for_workspace(&root, config)?;
    Ok(Workspace { root, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_workspace_wins() {
        let explicit = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let root = pick_workspace(Some(explicit.path()), Some(other.path()), other.path()).unwrap();
        assert_eq!(root, explicit.path().canonicalize().unwrap());
    }

    #[test]
    fn test_env_workspace_before_cwd() {
        let from_env = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        let root = pick_workspace(None, Some(from_env.path()), cwd.path()).unwrap();
        assert_eq!(root, from_env.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_env_workspace_falls_back_to_cwd() {
        let cwd = tempfile::tempdir().unwrap();
        let missing = cwd.path().join("gone");
        let root = pick_workspace(None, Some(&missing), cwd.path()).unwrap();
        assert_eq!(root, cwd.path().canonicalize().unwrap());
    }

    #[test]
    fn test_missing_explicit_workspace_is_an_error() {
        let cwd = tempfile::tempdir().unwrap();
        let missing = cwd.path().join("gone");
        let err = pick_workspace(Some(&missing), None, cwd.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Workspace { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_error_names_config_file() {
        let err = parse("[fix]\nbogus = 1\n", Some(Path::new("/w/codemod.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config /w/codemod.toml"));

        let err = load_from_str("[fix]\nbogus = 1\n").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config: "));
    }
}
