//! Async client for the KEF speaker HTTP/JSON control API.
//!
//! The device exposes a small settings tree over HTTP. Every value travels
//! inside a tagged envelope (see [`value`]); reads and writes go through
//! `getData` / `setData`, and change notifications come from a long-polled
//! event queue (see [`events`]).
//!
//! [`KefClient`] is the concrete client. [`DeviceApi`] is the trait the
//! controller in `kefctl-core` programs against.

pub mod api;
pub mod client;
pub mod error;
pub mod events;
mod settings;
pub mod transport;
pub mod types;
pub mod value;

pub use api::DeviceApi;
pub use client::KefClient;
pub use error::Error;
pub use events::{EventStream, SubscriptionId};
pub use transport::TransportConfig;
pub use types::{
    DEFAULT_DEVICE_NAME, Endpoint, Field, KefValue, PhysicalSource, SpeakerModel, WATCHED_FIELDS,
};
pub use value::{RawValue, ValueKind, ValueType};
