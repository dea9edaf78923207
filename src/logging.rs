/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` overrides the default level (`warn`, or `error` when quiet).
pub fn init(quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if quiet { "error" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
