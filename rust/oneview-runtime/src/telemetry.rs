//! Optional tracing initialization for hosts embedding the runtime.
//!
//! Hosts that already configure `tracing` themselves do not need this.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub json_logs: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "oneview".to_string(),
            json_logs: false,
            default_filter: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(config: TelemetryConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if config.json_logs {
        let fmt_layer = tracing_subscriber::fmt::layer().json().flatten_event(true);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer();
        registry.with(fmt_layer).try_init()?;
    }

    tracing::debug!(service = %config.service_name, json = config.json_logs, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = TelemetryConfig::new("shop")
            .with_json_logs(true)
            .with_default_filter("debug");
        assert_eq!(config.service_name, "shop");
        assert!(config.json_logs);
        assert_eq!(config.default_filter, "debug");
    }
}
