//! Output formatting: table or JSON.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`,
//! structured formats use serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use kefctl_core::{AudioSystemInfo, ClientEvent, DeviceState, PhysicalSource, PlaybackInfo};

use crate::cli::{ColorMode, OutputFormat};

// ── Color ────────────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, which returns a pre-formatted string.
pub fn render_single<T>(format: OutputFormat, data: &T, detail_fn: impl Fn(&T) -> String) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::JsonCompact => render_json_compact(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Speaker views ────────────────────────────────────────────────────

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Key/value table for `kefctl status`.
pub fn state_table(state: &DeviceState) -> String {
    let rows = vec![
        PropertyRow {
            name: "Speaker",
            value: state.endpoint.clone().unwrap_or_else(|| "-".into()),
        },
        PropertyRow {
            name: "Name",
            value: state.system.name.clone(),
        },
        PropertyRow {
            name: "Model",
            value: state.system.model.to_string(),
        },
        PropertyRow {
            name: "Source",
            value: state.playback.source.to_string(),
        },
        PropertyRow {
            name: "Volume",
            value: state.playback.volume.to_string(),
        },
        PropertyRow {
            name: "Muted",
            value: yes_no(state.playback.is_muted).into(),
        },
    ];
    render_table(&rows)
}

/// One line per event for `kefctl watch` in table mode.
pub fn event_line(event: &ClientEvent, color: bool) -> String {
    let kind = format!("{:<8}", event.kind());
    let kind = if color {
        kind.cyan().bold().to_string()
    } else {
        kind
    };
    let detail = match event {
        ClientEvent::Playback(info) => playback_summary(info, color),
        ClientEvent::System(info) => system_summary(info),
    };
    format!("{kind} {detail}")
}

fn playback_summary(info: &PlaybackInfo, color: bool) -> String {
    let source = match (info.source, color) {
        (PhysicalSource::Usb, true) => info.source.green().to_string(),
        (PhysicalSource::Standby, true) => info.source.dimmed().to_string(),
        (_, true) => info.source.yellow().to_string(),
        (_, false) => info.source.to_string(),
    };
    let muted = if info.is_muted && color {
        " muted".red().to_string()
    } else if info.is_muted {
        " muted".into()
    } else {
        String::new()
    };
    format!("source={source} volume={}{muted}", info.volume)
}

fn system_summary(info: &AudioSystemInfo) -> String {
    format!("name={:?} model={}", info.name, info.model)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}
