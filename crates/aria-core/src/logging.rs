//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `ARIA_LOG` (then `RUST_LOG`) overrides the provided default level.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let filter = std::env::var("ARIA_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(default_level),
            |spec| EnvFilter::try_new(spec).unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
