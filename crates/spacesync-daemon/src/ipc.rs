//! IPC server for daemon communication
//!
//! Provides a Unix domain socket for the CLI and status-bar scripts to read
//! the synchronized space state and to request focus changes.
//!
//! Every message is one line of JSON tagged by `type`. A connection carries
//! a single request; `subscribe` keeps the connection open and streams a
//! `spaces` response each time the snapshot changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use crate::model::{Space, SpaceId};
use crate::sync::{MonitoringState, Synchronizer};

// ============================================================================
// IPC Message Types
// ============================================================================

/// Request messages sent from the CLI to the daemon
///
/// - `{"type": "spaces"}`
/// - `{"type": "focus_space", "space": "2", "need_window_focus": true}`
/// - `{"type": "focus_window", "window": 4021}`
/// - `{"type": "refresh"}`
/// - `{"type": "status"}`
/// - `{"type": "subscribe"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Current snapshot of spaces and windows
    Spaces,
    /// Switch to a space, optionally making sure one of its windows has focus
    FocusSpace {
        space: SpaceId,
        #[serde(default)]
        need_window_focus: bool,
    },
    FocusWindow {
        window: u64,
    },
    /// Re-query the window manager now
    Refresh,
    Status,
    /// Stream every snapshot change until the client disconnects
    Subscribe,
}

/// Response messages sent from the daemon back to the CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    Spaces {
        spaces: Vec<Space>,
    },
    /// Operation accepted
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Daemon status information
    Status {
        /// Backend in use, `None` when no window manager was found
        backend: Option<String>,
        event_based: bool,
        /// Whether the push listener is receiving notifications
        listening: bool,
        monitoring: bool,
        /// Number of spaces in the published snapshot
        spaces: usize,
    },
    Error {
        message: String,
    },
}

// ============================================================================
// IPC Server
// ============================================================================

/// IPC server for daemon communication via Unix domain socket
///
/// The socket file is removed when the server is dropped.
pub struct IpcServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl IpcServer {
    /// Bind the control socket at `socket_path`, or the default location
    ///
    /// A stale socket file left by a previous run is removed first.
    pub fn new(socket_path: Option<PathBuf>) -> Result<Self> {
        let socket_path = socket_path.unwrap_or_else(default_socket_path);

        if socket_path.exists() {
            tracing::debug!("Removing stale socket file: {}", socket_path.display());
            std::fs::remove_file(&socket_path).with_context(|| {
                format!(
                    "Failed to remove stale socket file: {}",
                    socket_path.display()
                )
            })?;
        }

        let listener = UnixListener::bind(&socket_path).with_context(|| {
            format!("Failed to create IPC socket at {}", socket_path.display())
        })?;

        tracing::info!("IPC server listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept IPC connection")?;

        tracing::debug!("Accepted IPC connection");

        Ok(stream)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::warn!("Failed to remove IPC socket file on shutdown: {}", e);
            } else {
                tracing::debug!("Removed IPC socket file: {}", self.socket_path.display());
            }
        }
    }
}

/// Default control socket location
///
/// `$XDG_RUNTIME_DIR/spacesync.sock` when the variable is set, otherwise
/// `/tmp/spacesync-$UID.sock`.
pub fn default_socket_path() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(runtime_dir) => PathBuf::from(runtime_dir).join("spacesync.sock"),
        None => {
            let uid = nix::unistd::getuid();
            PathBuf::from(format!("/tmp/spacesync-{}.sock", uid))
        }
    }
}

// ============================================================================
// IPC Connection Handler
// ============================================================================

/// Answer a single non-streaming request
pub fn dispatch(request: IpcRequest, sync: &Synchronizer) -> IpcResponse {
    match request {
        IpcRequest::Spaces => IpcResponse::Spaces {
            spaces: sync.current_spaces(),
        },
        IpcRequest::FocusSpace {
            space,
            need_window_focus,
        } => {
            if sync.backend().is_none() {
                return no_backend();
            }
            let message = format!("Switching to space {}", space);
            sync.switch_to_space(space, need_window_focus);
            IpcResponse::Success {
                message: Some(message),
            }
        }
        IpcRequest::FocusWindow { window } => {
            if sync.backend().is_none() {
                return no_backend();
            }
            sync.switch_to_window(window);
            IpcResponse::Success {
                message: Some(format!("Focusing window {}", window)),
            }
        }
        IpcRequest::Refresh => {
            if sync.state() == MonitoringState::Idle {
                return IpcResponse::Error {
                    message: "Not monitoring a window manager".to_string(),
                };
            }
            sync.request_refresh();
            IpcResponse::Success { message: None }
        }
        IpcRequest::Status => IpcResponse::Status {
            backend: sync.backend().map(|kind| kind.to_string()),
            event_based: sync.is_event_based(),
            listening: sync.is_listening(),
            monitoring: sync.state() != MonitoringState::Idle,
            spaces: sync.current_spaces().len(),
        },
        IpcRequest::Subscribe => IpcResponse::Error {
            message: "subscribe must be the first request on a connection".to_string(),
        },
    }
}

fn no_backend() -> IpcResponse {
    IpcResponse::Error {
        message: "No window manager backend is active".to_string(),
    }
}

async fn write_response<W>(writer: &mut W, response: &IpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json =
        serde_json::to_string(response).context("Failed to serialize IPC response")?;

    tracing::trace!("Sending IPC response: {}", response_json);

    writer
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write IPC response")?;
    writer
        .write_all(b"\n")
        .await
        .context("Failed to write newline")?;
    writer.flush().await.context("Failed to flush IPC response")?;

    Ok(())
}

/// Handle an incoming IPC connection.
///
/// Reads one request line and answers it. For `subscribe`, keeps writing
/// snapshots until the client closes its end or a write fails.
pub async fn handle_ipc_connection(mut stream: UnixStream, sync: Arc<Synchronizer>) -> Result<()> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read IPC request")?;

    if bytes_read == 0 {
        tracing::debug!("IPC connection closed without data");
        return Ok(());
    }

    let line = line.trim();
    tracing::debug!("Received IPC request: {}", line);

    let request = match serde_json::from_str::<IpcRequest>(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Failed to parse IPC request: {}", e);
            let response = IpcResponse::Error {
                message: format!("Invalid request: {}", e),
            };
            return write_response(&mut writer, &response).await;
        }
    };

    if request != IpcRequest::Subscribe {
        let response = dispatch(request, &sync);
        return write_response(&mut writer, &response).await;
    }

    // The first item is the current snapshot, then one per change
    let mut updates = WatchStream::new(sync.subscribe());
    let mut discarded = String::new();
    loop {
        tokio::select! {
            next = updates.next() => match next {
                Some(spaces) => write_response(&mut writer, &IpcResponse::Spaces { spaces }).await?,
                None => break,
            },
            read = reader.read_line(&mut discarded) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => discarded.clear(),
            },
        }
    }

    tracing::debug!("IPC subscriber disconnected");
    Ok(())
}
