//! Monitor configuration
//!
//! Built either directly from an endpoint URL or from a JSON options object
//! handed over by the host page:
//!
//! ```
//! use pagepulse_core::config::MonitorConfig;
//!
//! # fn example() -> Result<(), pagepulse_core::MonitorError> {
//! let config = MonitorConfig::from_json(r#"{ "endpoint": "/collect", "captureErrors": false }"#)?;
//! assert!(config.observe_metrics);
//! assert!(!config.capture_errors);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Collector URL every report is sent to
    pub endpoint: String,
    /// Subscribe to paint/LCP/layout-shift streams and send the load snapshot
    #[serde(default = "default_true")]
    pub observe_metrics: bool,
    /// Install the script, resource and rejection listeners
    #[serde(default = "default_true")]
    pub capture_errors: bool,
    /// Ask streams to replay entries recorded before subscription
    #[serde(default = "default_true")]
    pub buffered_entries: bool,
    /// Mirror diagnostics to the browser console
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool {
    true
}

impl MonitorConfig {
    /// Configuration with every feature enabled
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            observe_metrics: true,
            capture_errors: true,
            buffered_entries: true,
            debug: false,
        }
    }

    /// Parse and validate a JSON options object
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| MonitorError::InvalidConfig(format!("Failed to parse options: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check an endpoint was given. Relative URLs are resolved by the
    /// transport against the page, so any non-blank value is accepted.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(MonitorError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
