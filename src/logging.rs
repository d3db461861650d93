use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr because stdout carries
/// the control channel. With `debug` set, `RUST_LOG` may override the level.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
