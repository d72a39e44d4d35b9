//! # Tracing Setup
//!
//! Installs the process-wide `tracing` subscriber.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,market=debug,sqlx=warn";

/// Initializes logging with an env filter.
///
/// `RUST_LOG` overrides the default `info,market=debug,sqlx=warn`.
/// Safe to call more than once: later calls leave the first subscriber
/// in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::debug!("still alive");
    }
}
