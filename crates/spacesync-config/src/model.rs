//! Configuration data model

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the configuration file (tilde is expanded by callers)
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/spacesync/config.kdl";

/// Default interval between AeroSpace polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Default delay between a space switch and the follow-up window focus
pub const DEFAULT_FOCUS_SETTLE_MS: u64 = 100;

/// Default upper bound for a single window-manager CLI invocation
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Default datagram socket yabai signals write to
pub const DEFAULT_YABAI_SOCKET: &str = "/tmp/spacesync-yabai.sock";

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub backend: BackendConfig,
    pub yabai: YabaiConfig,
    pub aerospace: AerospaceConfig,
}

/// Global settings
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Control socket override; the daemon picks a runtime-dir path when unset
    pub control_socket: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Which window-manager integration to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Pick whichever supported window manager is running
    #[default]
    Auto,
    Yabai,
    Aerospace,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "yabai" => Ok(Self::Yabai),
            "aerospace" => Ok(Self::Aerospace),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Yabai => "yabai",
            Self::Aerospace => "aerospace",
        };
        f.write_str(name)
    }
}

/// Backend selection and timing
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Poll interval in milliseconds; 0 disables timer-driven polling
    pub poll_interval_ms: u64,
    pub focus_settle_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Auto,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            focus_settle_ms: DEFAULT_FOCUS_SETTLE_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
        }
    }
}

impl BackendConfig {
    /// `None` when polling is notification-driven only
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    pub fn focus_settle(&self) -> Duration {
        Duration::from_millis(self.focus_settle_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// yabai integration settings
#[derive(Debug, Clone)]
pub struct YabaiConfig {
    /// Binary name or absolute path
    pub binary: String,
    /// Datagram socket the daemon binds and yabai signals write to
    pub socket_path: PathBuf,
}

impl Default for YabaiConfig {
    fn default() -> Self {
        Self {
            binary: "yabai".to_string(),
            socket_path: PathBuf::from(DEFAULT_YABAI_SOCKET),
        }
    }
}

/// AeroSpace integration settings
#[derive(Debug, Clone)]
pub struct AerospaceConfig {
    pub binary: String,
}

impl Default for AerospaceConfig {
    fn default() -> Self {
        Self {
            binary: "aerospace".to_string(),
        }
    }
}
