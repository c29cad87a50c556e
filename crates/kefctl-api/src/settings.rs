// Settings endpoints
//
// `getData` / `setData`: single-value reads and writes addressed by path.

use serde_json::{Value, json};
use tracing::debug;

use crate::client::KefClient;
use crate::error::Error;
use crate::types::{Endpoint, Field, KefValue};
use crate::value::{RawValue, ValueKind};

const ROLE_VALUE: &str = "value";

impl KefClient {
    /// Write a typed value to a settable field.
    ///
    /// `POST /api/setData` with `{"path", "role": "value", "value": <envelope>}`
    pub async fn set_value<T: ValueKind + Sync>(
        &self,
        endpoint: &Endpoint,
        field: Field,
        value: T,
    ) -> Result<(), Error> {
        if !field.is_writable() {
            return Err(Error::UnsupportedOperation(format!(
                "setting {field} is not supported"
            )));
        }
        check_kind::<T>(field)?;

        let envelope = RawValue::from(value).encode()?;
        let body = json!({
            "path": field.path(),
            "role": ROLE_VALUE,
            "value": envelope,
        });
        let url = endpoint.route("/api/setData")?;
        self.post_json(url, &body).await?;

        debug!(%field, %endpoint, "value set");
        Ok(())
    }

    /// Read a field as a typed envelope.
    ///
    /// `GET /api/getData?roles=value&path=<path>`
    pub async fn get_value<T: ValueKind>(
        &self,
        endpoint: &Endpoint,
        field: Field,
    ) -> Result<RawValue<T>, Error> {
        check_kind::<T>(field)?;
        let envelope = self.get_envelope(endpoint, field).await?;
        RawValue::decode(envelope)
    }

    /// Read a field as a domain value, substituting the device defaults
    /// when the payload is `null`.
    pub async fn read(&self, endpoint: &Endpoint, field: Field) -> Result<KefValue, Error> {
        let envelope = self.get_envelope(endpoint, field).await?;
        let value = KefValue::decode(field, envelope)?.unwrap_or_else(|| KefValue::fallback(field));
        debug!(%field, %value, "got value");
        Ok(value)
    }

    /// Write a domain value. Only volume, mute and physical source are
    /// settable.
    pub async fn write(&self, endpoint: &Endpoint, value: KefValue) -> Result<(), Error> {
        match value {
            KefValue::Volume(v) => self.set_value(endpoint, Field::Volume, v).await,
            KefValue::Muted(m) => self.set_value(endpoint, Field::Muted, m).await,
            KefValue::Source(s) => self.set_value(endpoint, Field::PhysicalSource, s).await,
            other => Err(Error::UnsupportedOperation(format!(
                "setting {} is not supported",
                other.field()
            ))),
        }
    }

    /// Fetch the single envelope `getData` returns for a path.
    async fn get_envelope(&self, endpoint: &Endpoint, field: Field) -> Result<Value, Error> {
        let mut url = endpoint.route("/api/getData")?;
        url.query_pairs_mut()
            .append_pair("roles", ROLE_VALUE)
            .append_pair("path", field.path());

        let body = self.get_text(url).await?;
        let values: Vec<Value> = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("expected an array of values: {e}"), &body))?;

        values.into_iter().next().ok_or(Error::NoValue {
            path: field.path(),
        })
    }
}

fn check_kind<T: ValueKind>(field: Field) -> Result<(), Error> {
    if field.value_type() == T::TYPE {
        Ok(())
    } else {
        Err(Error::UnsupportedOperation(format!(
            "{field} holds {}, not {}",
            field.value_type().tag(),
            T::TYPE.tag()
        )))
    }
}
