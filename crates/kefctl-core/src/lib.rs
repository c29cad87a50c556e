//! State reconciliation between a KEF speaker and its consumers (CLI).
//!
//! - **[`Controller`]**: cheap-to-clone handle over a single actor task
//!   that owns the speaker model. Commands are routed through an `mpsc`
//!   inbox and answered over `oneshot` channels; detached device writes run
//!   on a task tracker so [`shutdown()`](Controller::shutdown) can wait for
//!   them.
//!
//! - **[`Command`]**: typed requests for every controller operation,
//!   executable through [`Controller::execute`].
//!
//! - **Domain model** ([`model`]): [`PlaybackInfo`] and [`AudioSystemInfo`]
//!   aggregates, published as full-snapshot [`ClientEvent`]s through a
//!   broadcast channel. Volume events from the speaker are debounced before
//!   they touch the model.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::CoreError;
pub use model::{
    AudioSystemInfo, ClientEvent, DeviceState, MAX_VOLUME, MIN_VOLUME, PlaybackInfo,
    clamp_volume,
};

pub use kefctl_api::{Endpoint, PhysicalSource, SpeakerModel};
