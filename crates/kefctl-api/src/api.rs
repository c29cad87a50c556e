// Device API seam
//
// `DeviceApi` is the surface the controller drives. `KefClient` is the
// production implementation; tests substitute a scripted fake.

use async_trait::async_trait;

use crate::client::KefClient;
use crate::error::Error;
use crate::events::{EventStream, SubscriptionId};
use crate::types::{Endpoint, Field, KefValue};

/// Typed access to a speaker's settings and event queue.
#[async_trait]
pub trait DeviceApi: Send + Sync + 'static {
    /// Write a settable value (volume, mute, physical source).
    async fn set(&self, endpoint: &Endpoint, value: KefValue) -> Result<(), Error>;

    /// Read a field, applying device defaults for `null` payloads.
    async fn get(&self, endpoint: &Endpoint, field: Field) -> Result<KefValue, Error>;

    /// Open the single event subscription.
    fn events(&self, endpoint: &Endpoint) -> Result<(EventStream, SubscriptionId), Error>;

    /// Terminate an event subscription. Unknown ids are ignored.
    fn terminate_events(&self, id: SubscriptionId);
}

#[async_trait]
impl DeviceApi for KefClient {
    async fn set(&self, endpoint: &Endpoint, value: KefValue) -> Result<(), Error> {
        self.write(endpoint, value).await
    }

    async fn get(&self, endpoint: &Endpoint, field: Field) -> Result<KefValue, Error> {
        self.read(endpoint, field).await
    }

    fn events(&self, endpoint: &Endpoint) -> Result<(EventStream, SubscriptionId), Error> {
        self.open_event_stream(endpoint)
    }

    fn terminate_events(&self, id: SubscriptionId) {
        self.terminate_event_stream(id);
    }
}
