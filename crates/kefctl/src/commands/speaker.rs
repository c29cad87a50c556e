//! Speaker command handlers.

use std::pin::pin;
use std::time::Duration;

use tokio_stream::StreamExt;

use kefctl_core::{Controller, DeviceState, Endpoint, PhysicalSource};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// How often `watch` checks that the speaker stream is still alive.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(2);

/// Bind and do one full read, failing if the speaker does not answer.
async fn connect(controller: &Controller, endpoint: Endpoint) -> Result<(), CliError> {
    controller.connect(endpoint, false).await?;
    Ok(())
}

fn print_state(state: &DeviceState, global: &GlobalOpts) {
    let rendered = output::render_single(global.output_format(), state, output::state_table);
    output::print_output(&rendered, global.quiet);
}

pub async fn status(
    controller: &Controller,
    endpoint: Endpoint,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    connect(controller, endpoint).await?;
    print_state(&controller.snapshot().await?, global);
    Ok(())
}

pub async fn mute(
    controller: &Controller,
    endpoint: Endpoint,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    connect(controller, endpoint).await?;
    controller.toggle_mute().await?;

    // The mute write is detached and lands during shutdown, so report the
    // state it is about to produce.
    let mut state = controller.snapshot().await?;
    state.playback.is_muted = !state.playback.is_muted;
    print_state(&state, global);
    Ok(())
}

pub async fn volume(
    controller: &Controller,
    endpoint: Endpoint,
    delta: i32,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    connect(controller, endpoint).await?;
    let volume = controller.change_volume(delta).await?;
    tracing::debug!(delta, volume, "volume changed");
    print_state(&controller.snapshot().await?, global);
    Ok(())
}

pub async fn on(
    controller: &Controller,
    endpoint: Endpoint,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    connect(controller, endpoint).await?;
    let mut state = controller.snapshot().await?;
    controller.turn_on_if_needed().await?;

    // The source write has completed, so report it without another read.
    if state.playback.source == PhysicalSource::Standby {
        state.playback.source = PhysicalSource::Usb;
    }
    print_state(&state, global);
    Ok(())
}

/// Print every `ClientEvent` until Ctrl-C or the speaker stream ends.
pub async fn watch(
    controller: &Controller,
    endpoint: Endpoint,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Subscribe first so the snapshots from the initial refresh are seen.
    let mut events = pin!(controller.event_stream());
    controller.connect(endpoint, true).await?;

    let color = output::should_color(global.color);
    let mut interrupt = pin!(tokio::signal::ctrl_c());
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);
    liveness.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = &mut interrupt => {
                tracing::info!("interrupted, stopping event listening");
                break;
            }

            Some(event) = events.next() => {
                let line = match global.output_format() {
                    OutputFormat::Table => output::event_line(&event, color),
                    OutputFormat::Json | OutputFormat::JsonCompact => {
                        output::render_json_compact(&event)
                    }
                };
                output::print_output(&line, global.quiet);
            }

            _ = liveness.tick() => {
                if !controller.snapshot().await?.streaming {
                    tracing::warn!("speaker event stream ended");
                    break;
                }
            }
        }
    }

    controller.stop_event_listening().await?;
    Ok(())
}
