//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use kefctl_config::ConfigError;
use kefctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the speaker")]
    #[diagnostic(
        code(kefctl::connection_failed),
        help(
            "Check that the speaker is powered and on the same network.\n\
             Cause: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Speaker did not answer in time")]
    #[diagnostic(
        code(kefctl::timeout),
        help("Increase the timeout with --timeout or check the speaker's network connection.")
    )]
    Timeout,

    // ── Speaker ──────────────────────────────────────────────────────
    #[error("Speaker error: {message}")]
    #[diagnostic(code(kefctl::speaker))]
    Speaker { message: String },

    #[error("{0}")]
    #[diagnostic(code(kefctl::busy))]
    Busy(String),

    // ── Configuration ────────────────────────────────────────────────
    #[error("No speaker configured")]
    #[diagnostic(
        code(kefctl::no_speaker),
        help(
            "Pass --address <ip>, set KEF_ADDRESS, or add a profile with:\n\
             kefctl config init --speaker <ip>\n\
             Config file: {path}"
        )
    )]
    NoSpeaker { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(kefctl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: kefctl config init --name {name} --speaker <ip>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Profile '{name}' already exists")]
    #[diagnostic(code(kefctl::conflict), help("Use --force to replace it."))]
    ProfileExists { name: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(kefctl::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(kefctl::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render configuration: {0}")]
    #[diagnostic(code(kefctl::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::NoSpeaker { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::ProfileExists { .. } | Self::Busy(_) => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Speaker { .. } | Self::Config(_) | Self::Io(_) | Self::Toml(_) => {
                exit_code::GENERAL
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::AlreadySubscribed => Self::Busy(CoreError::AlreadySubscribed.to_string()),
            CoreError::Config { message } | CoreError::InvalidValue { message } => {
                Self::Validation {
                    field: "speaker".into(),
                    reason: message,
                }
            }
            other => Self::Speaker {
                message: other.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoProfile => Self::NoSpeaker {
                path: kefctl_config::config_path().display().to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other),
        }
    }
}
