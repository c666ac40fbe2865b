//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse the configuration file, falling back to defaults when it does not exist
///
/// Any other IO error, and every parse or validation error, is still returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl pins an older miette, so rebuild the span on our side
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => config.global = parse_global(node)?,
            "backend" => config.backend = parse_backend(node)?,
            "yabai" => config.yabai = parse_yabai(node)?,
            "aerospace" => config.aerospace = parse_aerospace(node)?,
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn first_string(node: &kdl::KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn required_string(node: &kdl::KdlNode, field: &str) -> Result<String, ConfigError> {
    match first_string(node) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::MissingField {
            field: format!("{} (e.g., `{} \"value\"`)", field, node.name().value()),
        }),
    }
}

fn millis(node: &kdl::KdlNode) -> Result<u64, ConfigError> {
    let name = node.name().value();
    let value = node
        .entries()
        .first()
        .and_then(|e| e.value().as_i64())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("`{}` expects an integer number of milliseconds", name),
        })?;

    u64::try_from(value).map_err(|_| ConfigError::Invalid {
        message: format!("`{}` must not be negative (got {})", name, value),
    })
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|message| ConfigError::Invalid { message })?;
                    }
                }
                "control-socket" => {
                    let path = required_string(child, "control socket path")?;
                    global.control_socket = Some(shellexpand::tilde(&path).into_owned().into());
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_backend(node: &kdl::KdlNode) -> Result<BackendConfig, ConfigError> {
    let mut backend = BackendConfig::default();

    if let Some(kind) = first_string(node) {
        backend.kind = kind
            .parse()
            .map_err(|message| ConfigError::Invalid { message })?;
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "poll-interval-ms" => backend.poll_interval_ms = millis(child)?,
                "focus-settle-ms" => backend.focus_settle_ms = millis(child)?,
                "command-timeout-ms" => {
                    let timeout = millis(child)?;
                    if timeout == 0 {
                        return Err(ConfigError::Invalid {
                            message: "`command-timeout-ms` must be greater than zero".to_string(),
                        });
                    }
                    backend.command_timeout_ms = timeout;
                }
                name => {
                    tracing::warn!("Unknown backend config option: {}", name);
                }
            }
        }
    }

    Ok(backend)
}

fn parse_yabai(node: &kdl::KdlNode) -> Result<YabaiConfig, ConfigError> {
    let mut yabai = YabaiConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "binary" => yabai.binary = required_string(child, "yabai binary")?,
                "socket-path" => {
                    let path = required_string(child, "yabai socket path")?;
                    yabai.socket_path = shellexpand::tilde(&path).into_owned().into();
                }
                name => {
                    tracing::warn!("Unknown yabai config option: {}", name);
                }
            }
        }
    }

    Ok(yabai)
}

fn parse_aerospace(node: &kdl::KdlNode) -> Result<AerospaceConfig, ConfigError> {
    let mut aerospace = AerospaceConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "binary" => aerospace.binary = required_string(child, "aerospace binary")?,
                name => {
                    tracing::warn!("Unknown aerospace config option: {}", name);
                }
            }
        }
    }

    Ok(aerospace)
}
