// Shared transport configuration for building reqwest::Client instances.
//
// Command requests and long polls run on separate clients: a poll blocks
// server-side for up to `poll_wait`, so its client timeout must outlast
// that wait, while commands should fail fast.

use std::time::Duration;

const USER_AGENT: &str = concat!("kefctl/", env!("CARGO_PKG_VERSION"));

/// Slack added on top of the server-side poll wait before the client gives up.
const POLL_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout for `getData` / `setData` / `modifyQueue` requests.
    pub timeout: Duration,
    /// Server-side wait passed as `timeout=` to `pollQueue`.
    pub poll_wait: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_wait: Duration::from_secs(10),
        }
    }
}

impl TransportConfig {
    /// Build the client used for command and read requests.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?)
    }

    /// Build the client used for the event queue.
    ///
    /// Keeps connections alive between polls and allows each request to
    /// outlive the server-side wait.
    pub fn build_polling_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        Ok(reqwest::Client::builder()
            .timeout(self.poll_wait + POLL_TIMEOUT_MARGIN)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()?)
    }

    /// The poll wait in whole seconds, as the device expects it.
    pub(crate) fn poll_wait_secs(&self) -> u64 {
        self.poll_wait.as_secs().max(1)
    }
}
