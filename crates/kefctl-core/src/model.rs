// ── Domain model ──
//
// The two aggregates the controller owns, and the snapshot events it
// publishes. Values leave the controller only as clones.

use serde::Serialize;

pub use kefctl_api::{DEFAULT_DEVICE_NAME, PhysicalSource, SpeakerModel};

pub const MIN_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 100;

/// Clamp a volume into the device range.
pub fn clamp_volume(volume: i32) -> i32 {
    volume.clamp(MIN_VOLUME, MAX_VOLUME)
}

/// Current playback state of the speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackInfo {
    pub source: PhysicalSource,
    pub volume: i32,
    pub is_muted: bool,
}

impl Default for PlaybackInfo {
    fn default() -> Self {
        Self {
            source: PhysicalSource::Standby,
            volume: MIN_VOLUME,
            is_muted: false,
        }
    }
}

/// Static identity of the speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSystemInfo {
    pub name: String,
    pub model: SpeakerModel,
}

impl Default for AudioSystemInfo {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_owned(),
            model: SpeakerModel::Unknown,
        }
    }
}

/// Published whenever an aggregate changes. Always a full snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "kind", content = "info", rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum ClientEvent {
    Playback(PlaybackInfo),
    System(AudioSystemInfo),
}

impl ClientEvent {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Everything the controller currently knows, as returned by
/// [`Controller::snapshot`](crate::Controller::snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub endpoint: Option<String>,
    pub streaming: bool,
    pub playback: PlaybackInfo,
    pub system: AudioSystemInfo,
}
