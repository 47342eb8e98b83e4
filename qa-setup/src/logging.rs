use tracing_subscriber::EnvFilter;

/// Install the console logger.
///
/// `RUST_LOG` overrides the level, which otherwise is Debug in development
/// builds and Info in production builds. Records from the `log` macros are
/// forwarded to the subscriber.
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A logger installed earlier (e.g. by a test harness) wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
