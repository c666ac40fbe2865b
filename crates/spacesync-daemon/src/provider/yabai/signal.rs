//! yabai signal socket
//!
//! yabai signals run a shell action for every window-manager event. The
//! generated actions write one short text message per event to a Unix
//! datagram socket the daemon binds:
//!
//! ```text
//! space_changed:3       focus moved to space 3
//! window_created:2      windows of space 2 changed
//! space_destroyed       something changed, re-query everything
//! ```
//!
//! Each message is turned into a [`SpaceEvent`], querying yabai where the
//! message alone is not enough.

use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixDatagram;
use tokio::sync::{watch, Notify};
use tracing::{debug, trace, warn};

use super::client::YabaiClient;
use crate::model::SpaceId;
use crate::provider::{EventSender, ProviderError, SpaceEvent};

/// Largest datagram accepted from a signal action
const MAX_DATAGRAM_LEN: usize = 4096;

/// A parsed signal message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalMessage {
    SpaceChanged(Option<SpaceId>),
    SpaceCreated(Option<SpaceId>),
    SpaceDestroyed(Option<SpaceId>),
    /// A window was focused, created, destroyed or moved on a space
    WindowsChanged(Option<SpaceId>),
    Unknown(String),
}

impl SignalMessage {
    /// Parse `event[:payload]`; an empty payload counts as none
    pub fn from_wire(line: &str) -> Self {
        let line = line.trim();
        let (event, payload) = match line.split_once(':') {
            Some((event, payload)) => (event, payload.trim()),
            None => (line, ""),
        };
        let space = (!payload.is_empty() && payload != "null").then(|| SpaceId::from(payload));

        match event {
            "space_changed" => Self::SpaceChanged(space),
            "space_created" => Self::SpaceCreated(space),
            "space_destroyed" => Self::SpaceDestroyed(space),
            "window_focused" | "window_created" | "window_destroyed" | "window_moved" => {
                Self::WindowsChanged(space)
            }
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Remove a stale socket file and bind a fresh one
pub fn bind_socket(path: &Path) -> Result<UnixDatagram, ProviderError> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|source| ProviderError::BindFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }

    UnixDatagram::bind(path).map_err(|source| ProviderError::BindFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Turn a message into the event it implies
///
/// Messages without enough information, and per-space queries that fail,
/// fall back to a full re-query. A failed full query yields an empty state.
pub async fn resolve(client: &YabaiClient, message: SignalMessage) -> SpaceEvent {
    match message {
        SignalMessage::SpaceChanged(Some(space)) => return SpaceEvent::FocusChanged(space),
        SignalMessage::SpaceCreated(Some(space)) => return SpaceEvent::SpaceCreated(space),
        SignalMessage::SpaceDestroyed(Some(space)) => return SpaceEvent::SpaceDestroyed(space),
        SignalMessage::WindowsChanged(Some(space)) => match client.space_windows(&space).await {
            Ok(windows) => return SpaceEvent::WindowsUpdated { space, windows },
            Err(e) => {
                warn!(space = %space, error = %e, "Failed to query space windows, re-querying all spaces");
            }
        },
        SignalMessage::Unknown(line) => {
            debug!(message = %line, "Unrecognized signal message, re-querying all spaces");
        }
        _ => {}
    }

    full_state(client).await
}

async fn full_state(client: &YabaiClient) -> SpaceEvent {
    let spaces = client.spaces_with_windows().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to query yabai spaces");
        Vec::new()
    });
    SpaceEvent::InitialState(spaces)
}

/// Receive signal messages until `shutdown` fires or the socket fails
///
/// Events are sent in arrival order. A `refresh` notification sends a full
/// snapshot in that same order. Returns early if the receiving side of
/// `events` has gone away.
pub async fn run_signal_loop(
    socket: UnixDatagram,
    client: YabaiClient,
    events: EventSender,
    refresh: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

    loop {
        let received = tokio::select! {
            _ = shutdown.changed() => {
                debug!("Signal listener shutting down");
                return;
            }
            _ = refresh.notified() => {
                trace!("Refresh requested");
                if events.send(full_state(&client).await).await.is_err() {
                    debug!("Event receiver dropped, listener stopped");
                    return;
                }
                continue;
            }
            received = socket.recv(&mut buf) => received,
        };

        let len = match received {
            Ok(len) => len,
            Err(e) => {
                warn!(error = %e, "Signal socket receive failed, listener stopped");
                return;
            }
        };

        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            debug!(len, "Ignoring non-UTF-8 signal datagram");
            continue;
        };

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            trace!(message = line, "Received signal");
            let event = resolve(&client, SignalMessage::from_wire(line)).await;
            if events.send(event).await.is_err() {
                debug!("Event receiver dropped, listener stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::ScriptedRunner;
    use crate::provider::yabai::client::tests::scripted;

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            SignalMessage::from_wire("space_changed:3\n"),
            SignalMessage::SpaceChanged(Some(SpaceId::from("3")))
        );
        assert_eq!(
            SignalMessage::from_wire("window_moved:2"),
            SignalMessage::WindowsChanged(Some(SpaceId::from("2")))
        );
        assert_eq!(
            SignalMessage::from_wire("space_created:5"),
            SignalMessage::SpaceCreated(Some(SpaceId::from("5")))
        );
        assert_eq!(
            SignalMessage::from_wire("space_destroyed"),
            SignalMessage::SpaceDestroyed(None)
        );
    }

    #[test]
    fn test_parse_empty_payloads() {
        assert_eq!(
            SignalMessage::from_wire("window_focused:"),
            SignalMessage::WindowsChanged(None)
        );
        assert_eq!(
            SignalMessage::from_wire("window_focused:null"),
            SignalMessage::WindowsChanged(None)
        );
        assert_eq!(
            SignalMessage::from_wire("display_added:1"),
            SignalMessage::Unknown("display_added:1".to_string())
        );
        assert_eq!(
            SignalMessage::from_wire("window_resized:1"),
            SignalMessage::Unknown("window_resized:1".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_untracked_window_event_requeries() {
        let client = YabaiClient::new(scripted(), "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("window_title_changed:1")).await;
        assert!(matches!(event, SpaceEvent::InitialState(ref s) if s.len() == 1));
    }

    #[tokio::test]
    async fn test_resolve_focus_without_query() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = YabaiClient::new(runner.clone(), "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("space_changed:2")).await;

        assert_eq!(event, SpaceEvent::FocusChanged(SpaceId::from("2")));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_window_event_queries_space() {
        let runner = scripted();
        runner.respond(
            "yabai -m query --windows --space 2",
            r#"[{"id": 21, "app": "Mail", "title": "Inbox", "space": 2, "stack-index": 1}]"#,
        );
        let client = YabaiClient::new(runner, "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("window_created:2")).await;

        match event {
            SpaceEvent::WindowsUpdated { space, windows } => {
                assert_eq!(space, SpaceId::from("2"));
                assert_eq!(windows.len(), 1);
                assert_eq!(windows[0].id, 21);
            }
            other => panic!("Expected WindowsUpdated, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_failed_space_query_falls_back_to_full() {
        let runner = scripted();
        runner.fail("yabai -m query --windows --space 2");
        let client = YabaiClient::new(runner, "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("window_moved:2")).await;

        match event {
            SpaceEvent::InitialState(spaces) => assert_eq!(spaces.len(), 1),
            other => panic!("Expected InitialState, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_bare_event_requeries() {
        let client = YabaiClient::new(scripted(), "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("window_destroyed")).await;
        assert!(matches!(event, SpaceEvent::InitialState(ref s) if s.len() == 1));
    }

    #[tokio::test]
    async fn test_resolve_failed_full_query_is_empty_state() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = YabaiClient::new(runner, "yabai", None);

        let event = resolve(&client, SignalMessage::from_wire("space_destroyed")).await;
        assert_eq!(event, SpaceEvent::InitialState(Vec::new()));
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.sock");
        std::fs::write(&path, "stale").unwrap();

        let _socket = bind_socket(&path).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_bind_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("signals.sock");

        assert!(matches!(
            bind_socket(&path),
            Err(ProviderError::BindFailed { .. })
        ));
    }
}
