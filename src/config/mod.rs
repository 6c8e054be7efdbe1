pub mod loader;
pub mod schema;

pub use loader::{
    load_for_workspace, load_from_path, load_from_str, load_workspace, resolve_workspace,
    ConfigError, Workspace, CONFIG_FILE_NAME, WORKSPACE_ENV,
};
pub use schema::{
    CodemodConfig, DiscoveryConfig, FixConfig, TsServerConfig, ValidationError, ValidationIssue,
};
