//! Client configuration.

use std::time::Duration;

/// Origin of the remote API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Per-request timeout applied by the transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Constructor-time configuration for `ApiClient` and `UreqTransport`.
///
/// There is no runtime override: every request goes to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
