//! Logging bootstrap built on `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "debug,wgpu_core=info,wgpu_hal=info,naga=info";

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over [`DEFAULT_FILTER`].
///
/// # Panics
/// Panics if a global subscriber has already been installed.
pub fn init() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Same as [`init`], but returns an error instead of panicking when a
/// subscriber is already installed. Handy in tests.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_twice_does_not_panic() {
        let _ = try_init();
        assert!(try_init().is_err());
    }
}
