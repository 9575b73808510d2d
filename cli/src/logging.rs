use tracefold_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. Logs go to stderr so stdout stays
/// machine readable; `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_modules)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
