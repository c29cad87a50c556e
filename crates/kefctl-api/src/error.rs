use thiserror::Error;

/// Top-level error type for the `kefctl-api` crate.
///
/// Covers every failure mode of the device surface: envelope decoding,
/// HTTP transport, response shape, and the event-queue subscription.
/// `kefctl-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Codec ───────────────────────────────────────────────────────
    /// The envelope declares a different value kind than the one requested.
    #[error("Decoded type {found} != expected type {expected}")]
    DecodeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A value that has no wire representation (e.g. an unsupported source).
    #[error("Cannot encode value: {message}")]
    InvalidValue { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON was expected but the body could not be interpreted, with the
    /// raw body for debugging.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    /// `getData` returned an empty array.
    #[error("No value in response for {path}")]
    NoValue { path: &'static str },

    // ── Events ──────────────────────────────────────────────────────
    /// Only one event-queue subscription may be active per client.
    #[error("Event polling already started for this client")]
    AlreadySubscribed,

    // ── Fields ──────────────────────────────────────────────────────
    /// Field/operation combination the device API does not support.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            body: body.into(),
        }
    }
}
