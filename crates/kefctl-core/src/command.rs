// ── Command API ──
//
// Every controller operation flows through the `Command` enum. The actor
// task handles them one at a time, in arrival order.

use kefctl_api::Endpoint;

use crate::error::CoreError;

/// A command envelope sent through the actor inbox.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All operations a consumer can request of the controller.
#[derive(Debug, Clone)]
pub enum Command {
    /// Point the controller at a speaker. Restarts streaming if it was
    /// running or `start_streaming` is set, otherwise refreshes once.
    /// Failures are logged, not returned.
    Bind {
        endpoint: Endpoint,
        start_streaming: bool,
    },
    /// Same as `Bind`, but the refresh or stream failure is returned.
    Connect {
        endpoint: Endpoint,
        start_streaming: bool,
    },
    StartEventListening,
    StopEventListening,
    ToggleMute,
    ChangeVolume {
        delta: i32,
    },
    TurnOnIfNeeded,
    Refresh,
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// The volume the controller converged on.
    Volume(i32),
}
