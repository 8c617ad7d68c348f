use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "tilt_testserver=info";

/// Installs the global subscriber. Diagnostics go to stderr so stdout only
/// ever carries request dumps.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
