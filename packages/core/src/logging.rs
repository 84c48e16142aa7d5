//! Tracing subscriber setup for front-end hosts and test binaries

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "gistnotes_core=info";

/// Install a fmt subscriber honouring `RUST_LOG`, falling back to `default_filter`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let _ = init_logging(DEFAULT_LOG_FILTER);
        assert!(!init_logging(DEFAULT_LOG_FILTER));
    }
}
