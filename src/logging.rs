use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. Events go to stderr so stdout stays free for
/// CSV output. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(false);
        registry.with(layer).init();
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal());
        registry.with(layer).init();
    }
}
