use std::process::ExitCode;

use fishcoach::app::log_filter;
use fishcoach::settings::SettingsStore;
use tracing_subscriber::EnvFilter;

/// Terminal entry point for the fish coach.
///
/// Logs go to stderr so they do not interleave with the conversation; set
/// `RUST_LOG` to raise the level.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let store = SettingsStore::load();
    tracing::debug!(config_path = ?store.config_path(), "settings loaded");

    match fishcoach::app::run(store.settings()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "fish coach exited with an error");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
