use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Filter used when `RUST_LOG` is unset: sync progress at info, sqlx quiet.
pub const DEFAULT_LOG_FILTER: &str = "info,igdb_catalog_sync=info,sqlx=warn,reqwest=warn";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| anyhow::anyhow!("invalid log filter {default_filter:?}: {e}"))?;

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
