use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console logger with `RUST_LOG` filtering, defaulting to `info`.
///
/// The bot is designed to run unattended for weeks; everything worth
/// knowing (lottery winners, submitted hashes, rollbacks) goes through
/// `tracing` at `info`/`warn`/`error`.
pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
