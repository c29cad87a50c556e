// ── Controller configuration ──
//
// Runtime settings handed to `Controller::new`. Built by the CLI from
// kefctl-config profiles; never touches disk itself.

use std::time::Duration;

use kefctl_api::TransportConfig;

/// Configuration for a [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Timeout for individual get/set requests.
    pub timeout: Duration,
    /// Server-side wait for each event-queue poll.
    pub poll_wait: Duration,
    /// Quiet period before a burst of volume events is applied.
    pub volume_debounce: Duration,
    /// Capacity of the `ClientEvent` broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_wait: Duration::from_secs(10),
            volume_debounce: Duration::from_secs(1),
            event_channel_capacity: 64,
        }
    }
}

impl ControllerConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            poll_wait: self.poll_wait,
        }
    }
}
