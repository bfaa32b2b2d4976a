//! Spanstore command line support.
//!
//! Argument parsing and logging setup for the `spanstore` binary.

pub mod config;

pub use config::{Cli, Command, StorageArgs};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "spanstore={},spanstore_cli={},spanstore_persistence={}",
            level, level, level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
