//! yabai backend
//!
//! Queries go through the `yabai -m query` CLI. Changes are pushed by yabai
//! signals into a datagram socket (see [`signal`]), so this backend is
//! event-based and never polled.

mod client;
mod signal;
mod types;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use client::YabaiClient;
pub use signal::SignalMessage;
pub use types::{YabaiSpace, YabaiWindow};

use super::{
    EventBasedProvider, EventSender, FocusAwareProvider, ProviderError, SpaceEvent,
    SpacesProvider, SwitchableProvider,
};
use crate::model::{Space, SpaceId};

/// A running signal listener
struct Listener {
    shutdown: watch::Sender<bool>,
    refresh: Arc<Notify>,
    _task: JoinHandle<()>,
}

pub struct YabaiProvider {
    client: YabaiClient,
    socket_path: PathBuf,
    listener: Mutex<Option<Listener>>,
    listening: Arc<AtomicBool>,
}

impl YabaiProvider {
    pub fn new(client: YabaiClient, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            client,
            socket_path: socket_path.into(),
            listener: Mutex::new(None),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

#[async_trait]
impl SpacesProvider for YabaiProvider {
    async fn spaces_with_windows(&self) -> Result<Vec<Space>, ProviderError> {
        self.client.spaces_with_windows().await
    }
}

#[async_trait]
impl FocusAwareProvider for YabaiProvider {
    async fn focused_space_id(&self) -> Result<Option<SpaceId>, ProviderError> {
        self.client.focused_space().await
    }

    async fn focused_window_id(&self) -> Result<Option<u64>, ProviderError> {
        self.client.focused_window().await
    }
}

#[async_trait]
impl SwitchableProvider for YabaiProvider {
    async fn focus_space(&self, space: &SpaceId) -> Result<(), ProviderError> {
        self.client.focus_space(space).await
    }

    async fn focus_window(&self, window: u64) -> Result<(), ProviderError> {
        self.client.focus_window(window).await
    }
}

#[async_trait]
impl EventBasedProvider for YabaiProvider {
    async fn start_observing(&self, events: EventSender) {
        self.stop_observing();

        let spaces = self.client.spaces_with_windows().await.unwrap_or_else(|e| {
            warn!(error = %e, "Initial yabai query failed");
            Vec::new()
        });
        if events.send(SpaceEvent::InitialState(spaces)).await.is_err() {
            debug!("Event receiver dropped before the listener started");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());
        let client = self.client.clone();
        let path = self.socket_path.clone();
        let listening = self.listening.clone();
        let loop_refresh = refresh.clone();

        let task = tokio::spawn(async move {
            if *shutdown_rx.borrow() {
                return;
            }

            let socket = match signal::bind_socket(&path) {
                Ok(socket) => socket,
                Err(e) => {
                    // No retry: the session stays on its initial snapshot
                    error!(error = %e, "yabai signal listener unavailable");
                    return;
                }
            };

            // Stopped while binding: stop_observing may already have looked
            // for the file, so it is ours to remove
            if *shutdown_rx.borrow() {
                drop(socket);
                remove_socket_file(&path);
                return;
            }

            info!(path = %path.display(), "Listening for yabai signals");
            listening.store(true, Ordering::SeqCst);
            signal::run_signal_loop(socket, client, events, loop_refresh, shutdown_rx).await;
            listening.store(false, Ordering::SeqCst);
        });

        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        *listener = Some(Listener {
            shutdown,
            refresh,
            _task: task,
        });
    }

    fn stop_observing(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        let Some(listener) = listener else {
            return;
        };

        let _ = listener.shutdown.send(true);
        self.listening.store(false, Ordering::SeqCst);
        remove_socket_file(&self.socket_path);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn request_refresh(&self) -> bool {
        if !self.is_listening() {
            return false;
        }
        let listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        match listener.as_ref() {
            Some(listener) => {
                listener.refresh.notify_one();
                true
            }
            None => false,
        }
    }
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed signal socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove signal socket"),
    }
}

impl Drop for YabaiProvider {
    fn drop(&mut self) {
        self.stop_observing();
    }
}
