// ── Core error types ──
//
// User-facing errors from kefctl-core. Consumers never see reqwest errors
// or raw envelopes; the `From<kefctl_api::Error>` impl translates
// transport-layer failures into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup errors ─────────────────────────────────────────────────
    #[error("No speaker configured: {0}")]
    NotConfigured(String),

    #[error("Controller has stopped")]
    ControllerStopped,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to speaker: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Speaker request timed out")]
    Timeout,

    #[error("Speaker returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Decoded type {found} != expected type {expected}")]
    DecodeMismatch { expected: String, found: String },

    #[error("Speaker returned no value for {path}")]
    NoValue { path: String },

    #[error("Malformed response from speaker: {message}")]
    MalformedResponse { message: String },

    #[error("Expected a {expected} value, speaker returned {found}")]
    UnexpectedValue { expected: String, found: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Already listening to speaker events")]
    AlreadySubscribed,

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<kefctl_api::Error> for CoreError {
    fn from(err: kefctl_api::Error) -> Self {
        match err {
            kefctl_api::Error::DecodeMismatch { expected, found } => CoreError::DecodeMismatch {
                expected: expected.into(),
                found,
            },
            kefctl_api::Error::InvalidValue { message } => CoreError::InvalidValue { message },
            kefctl_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            kefctl_api::Error::Http { status, body } => CoreError::Http { status, body },
            kefctl_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid speaker address: {e}"),
            },
            kefctl_api::Error::MalformedResponse { message, body: _ } => {
                CoreError::MalformedResponse { message }
            }
            kefctl_api::Error::NoValue { path } => CoreError::NoValue { path: path.into() },
            kefctl_api::Error::AlreadySubscribed => CoreError::AlreadySubscribed,
            kefctl_api::Error::UnsupportedOperation(op) => CoreError::Unsupported(op),
        }
    }
}
