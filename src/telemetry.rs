use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for a verbosity level (number of `-v` flags).
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "coc_codemod=warn",
        1 => "coc_codemod=info",
        2 => "coc_codemod=debug",
        _ => "coc_codemod=trace",
    }
}

/// Initialize the tracing subscriber once per process.
///
/// `RUST_LOG` takes precedence over `verbosity`. Events go to stderr so they
/// never mix with the report on stdout.
pub fn init_tracing(verbosity: u8) {
    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(0), "coc_codemod=warn");
        assert_eq!(default_filter(2), "coc_codemod=debug");
        assert_eq!(default_filter(9), "coc_codemod=trace");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(0);
        init_tracing(3);
    }
}
