//! Generate the yabai signal registrations that feed the spacesync socket

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::ConfigError;
use crate::model::Config;

/// Label prefix for every generated signal, so reruns replace instead of stack
pub const SIGNAL_LABEL_PREFIX: &str = "spacesync_";

/// What a generated signal appends after `event:`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    /// Mission-control index of the affected space
    SpaceIndex,
    /// Index of the space owning `$YABAI_WINDOW_ID`
    WindowSpace,
    /// No payload; the daemon re-queries everything
    None,
}

/// Events registered with yabai, in registration order.
///
/// `space_destroyed` only exposes the vanished space's internal id, and a
/// destroyed window can no longer be queried, so both send the bare event.
const SIGNALS: &[(&str, Payload)] = &[
    ("space_changed", Payload::SpaceIndex),
    ("space_created", Payload::SpaceIndex),
    ("space_destroyed", Payload::None),
    ("window_focused", Payload::WindowSpace),
    ("window_created", Payload::WindowSpace),
    ("window_moved", Payload::WindowSpace),
    ("window_destroyed", Payload::None),
];

/// Format a UTC time as an ISO 8601 timestamp with second precision.
fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the shell action yabai runs for one event.
///
/// Single-quoted in the script, so `$YABAI_*` expands when the signal fires
/// rather than at registration time.
fn signal_action(event: &str, payload: Payload, yabai: &str, socket: &Path) -> String {
    let message = match payload {
        Payload::SpaceIndex => format!("{}:$YABAI_SPACE_INDEX", event),
        Payload::WindowSpace => format!(
            "{}:$({} -m query --windows --window $YABAI_WINDOW_ID | jq -r .space)",
            event, yabai
        ),
        Payload::None => event.to_string(),
    };

    format!(
        "echo \"{}\" | socat - UNIX-SENDTO:{}",
        message,
        socket.display()
    )
}

/// Generate a shell script registering one yabai signal per tracked event.
///
/// # Arguments
/// * `config` - The parsed configuration (yabai binary and socket path)
/// * `source_path` - The config file the script was generated from
pub fn generate_yabai_signals(config: &Config, source_path: &Path) -> String {
    let timestamp = format_timestamp(Utc::now());
    let source_display = source_path
        .canonicalize()
        .unwrap_or_else(|_| source_path.to_path_buf());
    let yabai = &config.yabai.binary;

    let mut output = String::new();
    output.push_str("#!/bin/sh\n");
    output.push_str("# Auto-generated by spacesync\n");
    output.push_str(&format!("# Source: {}\n", source_display.display()));
    output.push_str(&format!("# Generated: {}\n", timestamp));
    output.push_str("# DO NOT EDIT - changes will be overwritten\n\n");

    for (event, payload) in SIGNALS {
        let action = signal_action(event, *payload, yabai, &config.yabai.socket_path);
        output.push_str(&format!(
            "{} -m signal --add event={} label={}{} action='{}'\n",
            yabai, event, SIGNAL_LABEL_PREFIX, event, action
        ));
    }

    output
}

/// Write the signal script atomically and mark it executable.
///
/// The script is written to a temp file next to `output`, then renamed over
/// it, so a failed write leaves any previous script untouched.
pub fn write_yabai_signals(
    config: &Config,
    source_path: &Path,
    output: &Path,
) -> Result<(), ConfigError> {
    if config.yabai.binary.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: "yabai binary".to_string(),
        });
    }

    let content = generate_yabai_signals(config, source_path);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = output.with_extension("sh.tmp");

    if let Err(e) = std::fs::write(&temp_path, &content) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    if let Err(e) = std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o755)) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    if let Err(e) = std::fs::rename(&temp_path, output) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    tracing::info!("Wrote yabai signals to {}", output.display());

    Ok(())
}
