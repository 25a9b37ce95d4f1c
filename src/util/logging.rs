use std::io::IsTerminal;

use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Log lines go to stderr so stdout stays free for the progress bar; ANSI
/// colours are only used when stderr is a terminal.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}
