pub mod cli;
pub mod exporter;
pub mod load_config;

pub use cli::{dispatch, run, Cli, Commands};

/// Installs the stderr tracing subscriber used by both binaries. `RUST_LOG` overrides the
/// default `warn` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
