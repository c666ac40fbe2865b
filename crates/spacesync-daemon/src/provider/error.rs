//! Error types for window-manager backends

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a window manager
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The CLI binary could not be started
    #[error("Failed to run {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The CLI ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The CLI did not finish in time and was killed
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The CLI wrote something that is not UTF-8
    #[error("{program} produced non-UTF-8 output")]
    InvalidOutput { program: String },

    /// Query output did not match the expected JSON shape
    #[error("Failed to deserialize {what}: {source}")]
    DeserializeFailed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The event socket could not be bound
    #[error("Failed to bind event socket at {path}: {source}")]
    BindFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
