// Event queue long-polling
//
// The device exposes change notifications through a server-side queue:
// `modifyQueue` creates it with a set of subscribed paths and returns its
// id, then `pollQueue` blocks for up to the poll wait and returns any
// pending updates. A background task drives that loop and forwards decoded
// values to an `EventStream`. Each client holds at most one subscription.

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::client::{KefClient, send_get, send_post};
use crate::error::Error;
use crate::types::{Endpoint, Field, KefValue, WATCHED_FIELDS};

const EVENT_BUFFER: usize = 64;
const ITEM_TYPE_UPDATE: &str = "update";

// ── Subscription handle ─────────────────────────────────────────────

/// Identifies one event-polling session on a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) struct ActiveSubscription {
    id: SubscriptionId,
    cancel: CancellationToken,
}

pub(crate) type SubscriptionSlot = Arc<Mutex<Option<ActiveSubscription>>>;

/// Lock the slot. Every critical section leaves it consistent, so a
/// poisoned lock is still usable.
pub(crate) fn lock_slot(slot: &SubscriptionSlot) -> MutexGuard<'_, Option<ActiveSubscription>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clear the slot if it still belongs to `id`.
fn release(slot: &SubscriptionSlot, id: SubscriptionId) -> bool {
    let mut guard = lock_slot(slot);
    if guard.as_ref().is_some_and(|active| active.id == id) {
        *guard = None;
        true
    } else {
        false
    }
}

// ── EventStream ─────────────────────────────────────────────────────

/// Decoded device updates, in the order the device reported them.
///
/// Ends when the subscription is terminated, the poll loop fails, or the
/// device connection is lost.
pub struct EventStream {
    inner: ReceiverStream<KefValue>,
}

impl EventStream {
    /// Wrap a channel receiver. Useful for driving consumers from a fake
    /// device in tests.
    pub fn from_receiver(rx: mpsc::Receiver<KefValue>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Wait for the next update; `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<KefValue> {
        self.inner.next().await
    }
}

impl Stream for EventStream {
    type Item = KefValue;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ── Client surface ──────────────────────────────────────────────────

impl KefClient {
    /// Start polling the device's event queue for the watched fields.
    ///
    /// Returns immediately; queue creation happens on the background task,
    /// and a failure there simply ends the stream. Fails with
    /// [`Error::AlreadySubscribed`] while another subscription is active.
    pub fn open_event_stream(
        &self,
        endpoint: &Endpoint,
    ) -> Result<(EventStream, SubscriptionId), Error> {
        let id = SubscriptionId::new();
        let cancel = CancellationToken::new();

        {
            let mut slot = lock_slot(&self.subscription);
            if slot.is_some() {
                warn!(%endpoint, "event polling already running for this client");
                return Err(Error::AlreadySubscribed);
            }
            *slot = Some(ActiveSubscription {
                id,
                cancel: cancel.clone(),
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let poller = QueuePoller {
            http: self.polling().clone(),
            endpoint: endpoint.clone(),
            wait_secs: self.poll_wait_secs(),
            id,
            cancel,
            tx,
            slot: Arc::clone(&self.subscription),
        };
        tokio::spawn(poller.run());

        debug!(%id, %endpoint, "event polling started");
        Ok((EventStream::from_receiver(rx), id))
    }

    /// Stop the subscription `id`. The slot is freed at once so a new
    /// stream can be opened; the poll task exits after its in-flight
    /// request and discards anything that request returns.
    pub fn terminate_event_stream(&self, id: SubscriptionId) {
        let mut slot = lock_slot(&self.subscription);
        match slot.take() {
            Some(active) if active.id == id => {
                active.cancel.cancel();
                debug!(%id, "event polling terminated");
            }
            other => {
                *slot = other;
                warn!(%id, "no active event subscription with this id");
            }
        }
    }
}

// ── Poll loop ───────────────────────────────────────────────────────

struct QueuePoller {
    http: reqwest::Client,
    endpoint: Endpoint,
    wait_secs: u64,
    id: SubscriptionId,
    cancel: CancellationToken,
    tx: mpsc::Sender<KefValue>,
    slot: SubscriptionSlot,
}

impl QueuePoller {
    async fn run(self) {
        match self.poll_until_stopped().await {
            Ok(()) => debug!(id = %self.id, "event poll loop finished"),
            Err(e) => warn!(id = %self.id, error = %e, "event poll loop failed"),
        }
        if release(&self.slot, self.id) {
            debug!(id = %self.id, "subscription released by poll task");
        }
    }

    async fn poll_until_stopped(&self) -> Result<(), Error> {
        let queue_id = self.create_queue().await?;
        debug!(id = %self.id, %queue_id, "event queue created");

        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            // A dropped stream ends the loop even while the device is quiet.
            let events = tokio::select! {
                biased;
                () = self.tx.closed() => {
                    debug!(id = %self.id, "event stream dropped by consumer");
                    return Ok(());
                }
                events = self.poll_queue(&queue_id) => events?,
            };

            for event in events {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }
                trace!(%event, "device event");
                if self.tx.send(event).await.is_err() {
                    debug!(id = %self.id, "event stream dropped by consumer");
                    return Ok(());
                }
            }
        }
    }

    /// `POST /api/event/modifyQueue?queueId=&subscribe=[...]`
    async fn create_queue(&self) -> Result<String, Error> {
        let mut url = self.endpoint.route("/api/event/modifyQueue")?;
        url.query_pairs_mut()
            .append_pair("queueId", "")
            .append_pair("subscribe", &subscribe_query());

        let body = send_post(&self.http, url).await?;
        parse_queue_id(&body)
    }

    /// `GET /api/event/pollQueue?timeout=<secs>&queueId=<id>`
    async fn poll_queue(&self, queue_id: &str) -> Result<Vec<KefValue>, Error> {
        let mut url = self.endpoint.route("/api/event/pollQueue")?;
        url.query_pairs_mut()
            .append_pair("timeout", &self.wait_secs.to_string())
            .append_pair("queueId", queue_id);

        let body = send_get(&self.http, url).await?;
        let items: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("expected an array of queue items: {e}"), &body))?;

        Ok(decode_items(items))
    }
}

/// `subscribe=` value: every watched path as an `itemWithValue` entry.
fn subscribe_query() -> String {
    let subscribe: Vec<Value> = WATCHED_FIELDS
        .iter()
        .map(|field| json!({ "path": field.path(), "type": "itemWithValue" }))
        .collect();
    Value::Array(subscribe).to_string()
}

/// The queue id arrives as a JSON string literal, quotes included.
fn parse_queue_id(body: &str) -> Result<String, Error> {
    let body = body.trim();
    let id = serde_json::from_str::<String>(body)
        .unwrap_or_else(|_| body.trim_matches('"').to_owned());
    if id.is_empty() {
        return Err(Error::malformed("empty event queue id", body));
    }
    Ok(id)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueItem {
    item_type: Option<String>,
    path: Option<String>,
    item_value: Option<Value>,
}

/// Keep `update` items for known paths with non-null payloads. Anything
/// that fails to decode is logged and skipped.
fn decode_items(items: Vec<Value>) -> Vec<KefValue> {
    items.into_iter().filter_map(decode_item).collect()
}

fn decode_item(item: Value) -> Option<KefValue> {
    let item: QueueItem = serde_json::from_value(item).ok()?;
    if item.item_type.as_deref() != Some(ITEM_TYPE_UPDATE) {
        return None;
    }
    let path = item.path?;
    let Some(field) = Field::from_path(&path) else {
        trace!(%path, "ignoring update for unwatched path");
        return None;
    };

    match KefValue::decode(field, item.item_value?) {
        Ok(value) => value,
        Err(e) => {
            warn!(%path, error = %e, "dropping undecodable update");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::PhysicalSource;

    #[test]
    fn queue_id_is_unquoted() {
        assert_eq!(parse_queue_id("\"{abc-123}\"\n").unwrap(), "{abc-123}");
        assert_eq!(parse_queue_id("bare-id").unwrap(), "bare-id");
        assert!(parse_queue_id("\"\"").is_err());
    }

    #[test]
    fn decodes_updates_in_order() {
        let items = vec![
            json!({
                "itemType": "update",
                "path": "player:volume",
                "itemValue": { "type": "i32_", "i32_": 22 }
            }),
            json!({
                "itemType": "update",
                "path": "settings:/mediaPlayer/mute",
                "itemValue": { "type": "bool_", "bool_": true }
            }),
            json!({
                "itemType": "update",
                "path": "settings:/kef/play/physicalSource",
                "itemValue": { "type": "kefPhysicalSource", "kefPhysicalSource": "usb" }
            }),
            json!({
                "itemType": "update",
                "path": "settings:/deviceName",
                "itemValue": { "type": "string_", "string_": "Desk" }
            }),
        ];

        assert_eq!(
            decode_items(items),
            vec![
                KefValue::Volume(22),
                KefValue::Muted(true),
                KefValue::Source(PhysicalSource::Usb),
                KefValue::Name("Desk".into()),
            ]
        );
    }

    #[test]
    fn skips_unknown_null_and_broken_items() {
        let items = vec![
            json!({
                "itemType": "update",
                "path": "settings:/somethingElse",
                "itemValue": { "type": "i32_", "i32_": 1 }
            }),
            json!({
                "itemType": "add",
                "path": "player:volume",
                "itemValue": { "type": "i32_", "i32_": 5 }
            }),
            json!({
                "itemType": "update",
                "path": "player:volume",
                "itemValue": { "type": "i32_", "i32_": null }
            }),
            json!({
                "itemType": "update",
                "path": "player:volume",
                "itemValue": { "type": "bool_", "bool_": true }
            }),
            json!("not an item"),
            json!({
                "itemType": "update",
                "path": "player:volume",
                "itemValue": { "type": "i32_", "i32_": 9 }
            }),
        ];

        assert_eq!(decode_items(items), vec![KefValue::Volume(9)]);
    }

    #[test]
    fn subscribe_query_lists_watched_paths() {
        let entries: Vec<Value> = serde_json::from_str(&subscribe_query()).unwrap();
        assert_eq!(
            entries,
            vec![
                json!({ "path": "player:volume", "type": "itemWithValue" }),
                json!({ "path": "settings:/mediaPlayer/mute", "type": "itemWithValue" }),
                json!({ "path": "settings:/deviceName", "type": "itemWithValue" }),
                json!({ "path": "settings:/kef/play/physicalSource", "type": "itemWithValue" }),
            ]
        );
    }

    #[test]
    fn poisoned_slot_is_still_released() {
        let slot: SubscriptionSlot = Arc::new(Mutex::new(None));
        let id = SubscriptionId::new();
        *lock_slot(&slot) = Some(ActiveSubscription {
            id,
            cancel: CancellationToken::new(),
        });

        let poisoner = Arc::clone(&slot);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the slot");
        })
        .join();
        assert!(joined.is_err());
        assert!(slot.is_poisoned());

        assert!(release(&slot, id));
        assert!(lock_slot(&slot).is_none());
    }

    #[test]
    fn release_only_clears_matching_subscription() {
        let slot: SubscriptionSlot = Arc::new(Mutex::new(None));
        let id = SubscriptionId::new();
        *slot.lock().unwrap() = Some(ActiveSubscription {
            id,
            cancel: CancellationToken::new(),
        });

        assert!(!release(&slot, SubscriptionId::new()));
        assert!(slot.lock().unwrap().is_some());
        assert!(release(&slot, id));
        assert!(slot.lock().unwrap().is_none());
    }
}
