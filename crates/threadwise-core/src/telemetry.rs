use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Fails if a subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to initialize logging: {}", e)))
}

/// Install the global tracing subscriber using `general.log_level`
pub fn init_from_config(config: &AppConfig) -> Result<()> {
    init_logging(&config.general.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        // Whichever call comes first wins; the second must not panic
        let _ = init_logging("warn");
        assert!(init_logging("warn").is_err());
    }
}
