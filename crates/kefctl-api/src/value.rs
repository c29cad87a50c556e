//! Tagged value envelope codec.
//!
//! The device wraps every scalar in an envelope whose `type` field names the
//! kind, and whose payload lives under a key equal to that same tag:
//!
//! ```json
//! { "type": "i32_", "i32_": 42 }
//! { "type": "bool_", "bool_": null }
//! ```
//!
//! [`RawValue<T>`] maps between these envelopes and typed values. The set of
//! kinds is closed: each [`ValueKind`] implementor carries one [`ValueType`]
//! registry entry, and decoding refuses any envelope whose tag differs from
//! the requested kind. The codec is pure; it never performs I/O.

use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::PhysicalSource;

const TYPE_KEY: &str = "type";

// ── Kind registry ───────────────────────────────────────────────────

/// Every envelope kind the device speaks, with its fixed wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Text,
    Int32,
    Bool,
    PhysicalSource,
}

impl ValueType {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Text => "string_",
            Self::Int32 => "i32_",
            Self::Bool => "bool_",
            Self::PhysicalSource => "kefPhysicalSource",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        [Self::Text, Self::Int32, Self::Bool, Self::PhysicalSource]
            .into_iter()
            .find(|t| t.tag() == tag)
    }
}

/// A scalar that can travel inside an envelope.
pub trait ValueKind: Sized {
    const TYPE: ValueType;

    fn to_payload(&self) -> Result<Value, Error>;

    fn from_payload(payload: Value) -> Result<Self, Error>;
}

macro_rules! scalar_kind {
    ($ty:ty, $kind:expr) => {
        impl ValueKind for $ty {
            const TYPE: ValueType = $kind;

            fn to_payload(&self) -> Result<Value, Error> {
                serde_json::to_value(self).map_err(|e| Error::InvalidValue {
                    message: e.to_string(),
                })
            }

            fn from_payload(payload: Value) -> Result<Self, Error> {
                serde_json::from_value(payload.clone()).map_err(|e| {
                    Error::malformed(
                        format!("invalid {} payload: {e}", Self::TYPE.tag()),
                        payload.to_string(),
                    )
                })
            }
        }
    };
}

scalar_kind!(String, ValueType::Text);
scalar_kind!(i32, ValueType::Int32);
scalar_kind!(bool, ValueType::Bool);

impl ValueKind for PhysicalSource {
    const TYPE: ValueType = ValueType::PhysicalSource;

    fn to_payload(&self) -> Result<Value, Error> {
        match self {
            Self::Usb => Ok(Value::from("usb")),
            Self::Standby => Ok(Value::from("standby")),
            Self::Unsupported => Err(Error::InvalidValue {
                message: "unsupported physical source has no wire form".into(),
            }),
        }
    }

    fn from_payload(payload: Value) -> Result<Self, Error> {
        match payload {
            Value::String(s) => Ok(match s.as_str() {
                "usb" => Self::Usb,
                "standby" => Self::Standby,
                _ => Self::Unsupported,
            }),
            other => Err(Error::malformed(
                "invalid kefPhysicalSource payload: expected a string",
                other.to_string(),
            )),
        }
    }
}

// ── RawValue ────────────────────────────────────────────────────────

/// A typed envelope. `value` is `None` when the device sent a `null` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue<T> {
    pub value: Option<T>,
}

impl<T: ValueKind> RawValue<T> {
    pub fn new(value: Option<T>) -> Self {
        Self { value }
    }

    /// Build the `{type, <tag>: payload}` envelope.
    pub fn encode(&self) -> Result<Value, Error> {
        let tag = T::TYPE.tag();
        let payload = match &self.value {
            Some(v) => v.to_payload()?,
            None => Value::Null,
        };

        let mut envelope = Map::with_capacity(2);
        envelope.insert(TYPE_KEY.into(), Value::from(tag));
        envelope.insert(tag.into(), payload);
        Ok(Value::Object(envelope))
    }

    /// Decode an already-parsed envelope.
    pub fn decode(envelope: Value) -> Result<Self, Error> {
        let Value::Object(mut map) = envelope else {
            return Err(Error::malformed(
                "envelope is not a JSON object",
                envelope.to_string(),
            ));
        };

        let expected = T::TYPE.tag();
        let found = map.get(TYPE_KEY).and_then(Value::as_str).map(str::to_owned);
        let Some(found) = found else {
            return Err(Error::malformed(
                "envelope has no type tag",
                Value::Object(map).to_string(),
            ));
        };
        if found != expected {
            return Err(Error::DecodeMismatch { expected, found });
        }

        let Some(payload) = map.remove(expected) else {
            return Err(Error::malformed(
                format!("envelope has no {expected} field"),
                Value::Object(map).to_string(),
            ));
        };

        let value = match payload {
            Value::Null => None,
            payload => Some(T::from_payload(payload)?),
        };
        Ok(Self { value })
    }

    /// Parse and decode an envelope from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let json: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::malformed(e.to_string(), String::from_utf8_lossy(bytes)))?;
        Self::decode(json)
    }

    /// Encode straight to JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let envelope = self.encode()?;
        serde_json::to_vec(&envelope).map_err(|e| Error::InvalidValue {
            message: e.to_string(),
        })
    }
}

impl<T> From<T> for RawValue<T> {
    fn from(value: T) -> Self {
        Self { value: Some(value) }
    }
}
