// Device-facing value types
//
// Paths, decoded values, and the device endpoint. Nothing here carries a
// raw wire envelope; see `value` for the codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::value::{RawValue, ValueType};

// ── PhysicalSource ──────────────────────────────────────────────────

/// The speaker's active physical input.
///
/// `Unsupported` is what any unrecognized wire string decodes to. It has no
/// wire representation of its own and is rejected by the encoder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhysicalSource {
    #[default]
    Standby,
    Usb,
    Unsupported,
}

// ── SpeakerModel ────────────────────────────────────────────────────

/// Known speaker models, derived from the device's model-name setting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "camelCase")]
pub enum SpeakerModel {
    #[strum(serialize = "LSX II")]
    LsxII,
    #[strum(serialize = "LS50 Wireless II")]
    Ls50,
    #[strum(serialize = "LS60 Wireless")]
    Ls60,
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
}

/// Model-name strings reported by `settings:/kef/host/modelName`.
const MODEL_NAMES: &[(&str, SpeakerModel)] = &[
    ("SP4041", SpeakerModel::LsxII),
    ("SP4017", SpeakerModel::Ls50),
    ("SP4077", SpeakerModel::Ls60),
];

impl SpeakerModel {
    /// Look up a device-reported model name. Unrecognized names map to
    /// [`SpeakerModel::Unknown`].
    pub fn from_model_name(name: &str) -> Self {
        MODEL_NAMES
            .iter()
            .find(|(known, _)| *known == name)
            .map_or(Self::Unknown, |(_, model)| *model)
    }
}

// ── Field ───────────────────────────────────────────────────────────

/// A device setting addressable through `getData` / `setData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Volume,
    Muted,
    PhysicalSource,
    DeviceName,
    ModelName,
}

/// Paths subscribed to on the event queue. `ModelName` is read-only and
/// never changes at runtime, so it is not watched.
pub const WATCHED_FIELDS: [Field; 4] = [
    Field::Volume,
    Field::Muted,
    Field::DeviceName,
    Field::PhysicalSource,
];

impl Field {
    /// The device path for this setting (case-sensitive).
    pub const fn path(self) -> &'static str {
        match self {
            Self::Volume => "player:volume",
            Self::Muted => "settings:/mediaPlayer/mute",
            Self::PhysicalSource => "settings:/kef/play/physicalSource",
            Self::DeviceName => "settings:/deviceName",
            Self::ModelName => "settings:/kef/host/modelName",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        [
            Self::Volume,
            Self::Muted,
            Self::PhysicalSource,
            Self::DeviceName,
            Self::ModelName,
        ]
        .into_iter()
        .find(|f| f.path() == path)
    }

    /// The envelope kind the device uses for this path.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Volume => ValueType::Int32,
            Self::Muted => ValueType::Bool,
            Self::PhysicalSource => ValueType::PhysicalSource,
            Self::DeviceName | Self::ModelName => ValueType::Text,
        }
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Volume | Self::Muted | Self::PhysicalSource)
    }
}

// ── KefValue ────────────────────────────────────────────────────────

/// A decoded device value, either read directly or delivered by the
/// event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KefValue {
    Volume(i32),
    Muted(bool),
    Source(PhysicalSource),
    Name(String),
    Model(SpeakerModel),
}

impl KefValue {
    /// The field this value belongs to.
    pub fn field(&self) -> Field {
        match self {
            Self::Volume(_) => Field::Volume,
            Self::Muted(_) => Field::Muted,
            Self::Source(_) => Field::PhysicalSource,
            Self::Name(_) => Field::DeviceName,
            Self::Model(_) => Field::ModelName,
        }
    }

    /// Decode an envelope received for `field`. `Ok(None)` means the device
    /// sent a `null` payload.
    pub fn decode(field: Field, envelope: serde_json::Value) -> Result<Option<Self>, Error> {
        Ok(match field {
            Field::Volume => RawValue::<i32>::decode(envelope)?.value.map(Self::Volume),
            Field::Muted => RawValue::<bool>::decode(envelope)?.value.map(Self::Muted),
            Field::PhysicalSource => RawValue::<PhysicalSource>::decode(envelope)?
                .value
                .map(Self::Source),
            Field::DeviceName => RawValue::<String>::decode(envelope)?.value.map(Self::Name),
            Field::ModelName => RawValue::<String>::decode(envelope)?
                .value
                .map(|name| Self::Model(SpeakerModel::from_model_name(&name))),
        })
    }

    /// What a read of `field` yields when the device has no value.
    pub fn fallback(field: Field) -> Self {
        match field {
            Field::Volume => Self::Volume(0),
            Field::Muted => Self::Muted(false),
            Field::PhysicalSource => Self::Source(PhysicalSource::Unsupported),
            Field::DeviceName => Self::Name(DEFAULT_DEVICE_NAME.to_owned()),
            Field::ModelName => Self::Model(SpeakerModel::Unknown),
        }
    }
}

/// Name reported when the device leaves `settings:/deviceName` empty.
pub const DEFAULT_DEVICE_NAME: &str = "KEF";

impl fmt::Display for KefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume(v) => write!(f, "volume={v}"),
            Self::Muted(m) => write!(f, "muted={m}"),
            Self::Source(s) => write!(f, "source={s}"),
            Self::Name(n) => write!(f, "name={n:?}"),
            Self::Model(m) => write!(f, "model={m}"),
        }
    }
}

// ── Endpoint ────────────────────────────────────────────────────────

/// The HTTP root of a single speaker, e.g. `http://192.168.1.20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Parse a bare IP/hostname, a `host:port` pair, or a full URL.
    pub fn parse(address: &str) -> Result<Self, Error> {
        let address = address.trim();
        let base = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("http://{address}"))?
        };
        if base.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
        }
        Ok(Self { base })
    }

    pub fn from_url(base: Url) -> Self {
        Self { base }
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    /// Build a full URL for an API route such as `/api/getData`.
    pub(crate) fn route(&self, route: &str) -> Result<Url, Error> {
        let base = self.base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{route}"))?)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.base.host_str().unwrap_or_default();
        match self.base.port() {
            Some(port) => write!(f, "{host}:{port}"),
            None => f.write_str(host),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_accepts_bare_address() {
        let ep = Endpoint::parse("192.168.23.106").unwrap();
        assert_eq!(ep.url().as_str(), "http://192.168.23.106/");
        assert_eq!(ep.to_string(), "192.168.23.106");
    }

    #[test]
    fn endpoint_accepts_host_and_port() {
        let ep: Endpoint = "speaker.local:8080".parse().unwrap();
        assert_eq!(ep.to_string(), "speaker.local:8080");
        assert_eq!(
            ep.route("/api/getData").unwrap().as_str(),
            "http://speaker.local:8080/api/getData"
        );
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(Endpoint::parse("http://").is_err());
        assert!(Endpoint::parse("").is_err());
    }

    #[test]
    fn model_lookup_falls_back_to_unknown() {
        assert_eq!(SpeakerModel::from_model_name("SP4041"), SpeakerModel::LsxII);
        assert_eq!(SpeakerModel::from_model_name("sp4041"), SpeakerModel::Unknown);
        assert_eq!(SpeakerModel::from_model_name(""), SpeakerModel::Unknown);
    }

    #[test]
    fn field_paths_round_trip() {
        for field in WATCHED_FIELDS {
            assert_eq!(Field::from_path(field.path()), Some(field));
        }
        assert_eq!(
            Field::from_path("settings:/kef/host/modelName"),
            Some(Field::ModelName)
        );
        assert_eq!(Field::from_path("Player:Volume"), None);
    }

    #[test]
    fn decodes_by_field_with_fallbacks() {
        use serde_json::json;

        let model = KefValue::decode(
            Field::ModelName,
            json!({ "type": "string_", "string_": "SP4041" }),
        )
        .unwrap();
        assert_eq!(model, Some(KefValue::Model(SpeakerModel::LsxII)));

        let muted =
            KefValue::decode(Field::Muted, json!({ "type": "bool_", "bool_": null })).unwrap();
        assert_eq!(muted, None);
        assert_eq!(KefValue::fallback(Field::Muted), KefValue::Muted(false));
        assert_eq!(
            KefValue::fallback(Field::DeviceName),
            KefValue::Name("KEF".into())
        );
        assert_eq!(
            KefValue::fallback(Field::PhysicalSource),
            KefValue::Source(PhysicalSource::Unsupported)
        );

        assert!(
            KefValue::decode(Field::Volume, json!({ "type": "bool_", "bool_": true })).is_err()
        );
    }

    #[test]
    fn only_playback_fields_are_writable() {
        assert!(Field::Volume.is_writable());
        assert!(Field::Muted.is_writable());
        assert!(Field::PhysicalSource.is_writable());
        assert!(!Field::DeviceName.is_writable());
        assert!(!Field::ModelName.is_writable());
    }
}
