// Shared transport configuration for building the reqwest::Client.
//
// The cloud endpoint serves a publicly trusted certificate, so the only
// knobs are the request timeout and the user agent.

use std::time::Duration;

/// Default request timeout applied by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("smartcocoon-rs/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(crate::error::Error::Transport)
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
