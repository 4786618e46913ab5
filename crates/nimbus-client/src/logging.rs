//! Tracing subscriber setup for binaries and examples.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber with the default filter.
pub fn init() {
    init_with_filter("nimbus=info");
}

/// Install the global subscriber; `RUST_LOG` wins over `default_filter`.
///
/// Safe to call more than once: later calls are no-ops.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init_with_filter("nimbus=debug");
    }
}
