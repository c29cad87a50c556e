//! Command dispatch: routes parsed CLI commands to their handlers.

pub mod config_cmd;
pub mod speaker;

use kefctl_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::config::Target;
use crate::error::CliError;

/// Run a speaker command against a freshly created controller.
///
/// The controller is always shut down afterwards so detached writes reach
/// the speaker before the process exits.
pub async fn dispatch(cmd: Command, target: Target, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = Controller::new(&target.controller)?;
    let endpoint = target.endpoint;

    let result = match cmd {
        Command::Status => speaker::status(&controller, endpoint, global).await,
        Command::Mute => speaker::mute(&controller, endpoint, global).await,
        Command::Volume(args) => speaker::volume(&controller, endpoint, args.delta, global).await,
        Command::On => speaker::on(&controller, endpoint, global).await,
        Command::Watch => speaker::watch(&controller, endpoint, global).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled before dispatch"),
    };

    controller.shutdown().await;
    result
}
