// KEF device HTTP client
//
// Wraps `reqwest::Client` with device route construction and status
// handling. Endpoint groups (settings, event queue) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, trace};
use url::Url;

use crate::error::Error;
use crate::events::{SubscriptionSlot, lock_slot};
use crate::transport::TransportConfig;

/// Raw HTTP client for a KEF speaker's JSON API.
///
/// A single client can address any endpoint; the device address is passed
/// per call. The client owns at most one event-queue subscription at a
/// time (see [`open_event_stream`](Self::open_event_stream)).
pub struct KefClient {
    http: reqwest::Client,
    /// Separate client for long polls, with a timeout above the poll wait.
    polling: reqwest::Client,
    poll_wait_secs: u64,
    pub(crate) subscription: SubscriptionSlot,
}

impl KefClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            polling: transport.build_polling_client()?,
            poll_wait_secs: transport.poll_wait_secs(),
            subscription: Arc::new(Mutex::new(None)),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` used for both
    /// commands and polling.
    pub fn with_client(http: reqwest::Client, poll_wait_secs: u64) -> Self {
        Self {
            polling: http.clone(),
            http,
            poll_wait_secs,
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn polling(&self) -> &reqwest::Client {
        &self.polling
    }

    pub(crate) fn poll_wait_secs(&self) -> u64 {
        self.poll_wait_secs
    }

    /// Whether an event-queue subscription is currently held.
    pub fn has_active_subscription(&self) -> bool {
        lock_slot(&self.subscription).is_some()
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and return the body of a 2xx response.
    pub(crate) async fn get_text(&self, url: Url) -> Result<String, Error> {
        send_get(&self.http, url).await
    }

    /// Send a POST request with a JSON body and return the response body.
    pub(crate) async fn post_json(
        &self,
        url: Url,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<String, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        read_body(resp).await
    }
}

/// GET on an arbitrary client; shared with the poll task.
pub(crate) async fn send_get(http: &reqwest::Client, url: Url) -> Result<String, Error> {
    debug!("GET {}", url);
    let resp = http.get(url).send().await?;
    read_body(resp).await
}

/// POST without a body; shared with the poll task.
pub(crate) async fn send_post(http: &reqwest::Client, url: Url) -> Result<String, Error> {
    debug!("POST {}", url);
    let resp = http.post(url).send().await?;
    read_body(resp).await
}

/// Return the body of a 2xx response, or `Error::Http` carrying the body.
async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "device request failed");
        return Err(Error::Http {
            status: status.as_u16(),
            body,
        });
    }

    let body = resp.text().await?;
    trace!(body = %body, "device response");
    Ok(body)
}
