pub mod config;

pub use config::{
    Config, SearchConfig, StorageConfig, ValidationResult, WeatherApiConfig, API_KEY_PLACEHOLDER,
};

use anyhow::Result;

/// Initialize logging for the application
pub fn init() -> Result<()> {
    // Ignore the error if a subscriber is already installed (tests, embedders)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Skycast core initialized");
    Ok(())
}
