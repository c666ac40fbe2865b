//! Space synchronizer
//!
//! Keeps an always-current, sorted snapshot of spaces and windows for one
//! backend and publishes it through a `watch` channel.
//!
//! ```text
//! push backend ──┐
//!                ├──> mpsc ──> state task ──> watch<Vec<Space>> ──> subscribers
//! poll driver  ──┘
//! ```
//!
//! The state task is the only writer of canonical state. Backend listeners,
//! the poll driver and refresh requests all reach it through the same
//! channel, so events apply in the order they were sent.

mod poll;
mod state;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use spacesync_config::{BackendConfig, BackendKind, DEFAULT_POLL_INTERVAL_MS};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

pub use state::SpaceState;

use self::poll::PollDriver;
use crate::model::{Space, SpaceId};
use crate::provider::{AnyProvider, EventReceiver, EventSender, SpaceEvent, DEFAULT_CHANNEL_BUFFER};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Poll interval for backends without push; `None` polls on notification only
    pub poll_interval: Option<Duration>,
    pub event_buffer: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: Some(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)),
            event_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl From<&BackendConfig> for SyncSettings {
    fn from(config: &BackendConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            ..Self::default()
        }
    }
}

/// How changes reach the state task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Push,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    Idle,
    Monitoring { strategy: Strategy },
}

/// Everything owned by one monitoring run
struct Session {
    strategy: Strategy,
    events: EventSender,
    state_task: JoinHandle<()>,
    observer: Option<JoinHandle<()>>,
    poller: Option<PollDriver>,
}

pub struct Synchronizer {
    provider: Option<Arc<AnyProvider>>,
    settings: SyncSettings,
    published: Arc<watch::Sender<Vec<Space>>>,
    activity: Arc<Notify>,
    session: Mutex<Option<Session>>,
}

impl Synchronizer {
    /// Without a provider the published state stays empty forever
    pub fn new(provider: Option<AnyProvider>, settings: SyncSettings) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            provider: provider.map(Arc::new),
            settings,
            published: Arc::new(published),
            activity: Arc::new(Notify::new()),
            session: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.provider.as_ref().map(|p| p.kind())
    }

    pub fn is_event_based(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_event_based())
    }

    /// Whether the push listener is up; always `false` for polled backends
    pub fn is_listening(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_listening())
    }

    pub fn state(&self) -> MonitoringState {
        match self.lock_session().as_ref() {
            Some(session) => MonitoringState::Monitoring {
                strategy: session.strategy,
            },
            None => MonitoringState::Idle,
        }
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start receiving backend changes. A no-op while already monitoring.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_monitoring(&self) {
        let mut session = self.lock_session();
        if session.is_some() {
            debug!("Already monitoring");
            return;
        }

        let Some(provider) = self.provider.clone() else {
            info!("No window manager backend, space state stays empty");
            return;
        };

        let (events, receiver) = mpsc::channel(self.settings.event_buffer);
        let state_task = tokio::spawn(run_state_loop(receiver, self.published.clone()));

        let (strategy, observer, poller) = if provider.is_event_based() {
            let observer = provider.clone();
            let sender = events.clone();
            let task = tokio::spawn(async move { observer.start_observing(sender).await });
            (Strategy::Push, Some(task), None)
        } else {
            let poller = PollDriver::spawn(
                provider.clone(),
                self.settings.poll_interval,
                self.activity.clone(),
                events.clone(),
            );
            (Strategy::Poll, None, Some(poller))
        };

        info!(backend = %provider.kind(), ?strategy, "Monitoring started");
        *session = Some(Session {
            strategy,
            events,
            state_task,
            observer,
            poller,
        });
    }

    /// Stop receiving changes and drop canonical state. Idempotent.
    ///
    /// The last published snapshot stays readable.
    pub fn stop_monitoring(&self) {
        let Some(session) = self.lock_session().take() else {
            return;
        };

        // Abort a start still in flight before tearing the listener down
        if let Some(observer) = session.observer {
            observer.abort();
        }
        if let Some(provider) = &self.provider {
            provider.stop_observing();
        }
        if let Some(poller) = session.poller {
            poller.stop();
        }
        session.state_task.abort();

        info!("Monitoring stopped");
    }

    /// Latest published snapshot, sorted by space id
    pub fn current_spaces(&self) -> Vec<Space> {
        self.published.borrow().clone()
    }

    /// Receiver that wakes only when the snapshot actually changes
    pub fn subscribe(&self) -> watch::Receiver<Vec<Space>> {
        self.published.subscribe()
    }

    /// Wake the poll driver for an immediate refresh
    ///
    /// Hook for OS activation notifications; ignored by push backends, which
    /// hear about changes on their own.
    pub fn notify_activity(&self) {
        self.activity.notify_one();
    }

    /// Bring the snapshot up to date out of band
    pub fn request_refresh(&self) {
        let session = self.lock_session();
        let Some(session) = session.as_ref() else {
            debug!("Refresh requested while idle, ignoring");
            return;
        };
        let Some(provider) = self.provider.clone() else {
            return;
        };

        match session.strategy {
            Strategy::Poll => self.notify_activity(),
            // The listener orders the re-query with the signals it receives
            Strategy::Push if provider.request_refresh() => {}
            Strategy::Push => {
                // No listener to race with, query directly
                let events = session.events.clone();
                tokio::spawn(async move {
                    let spaces = provider.get_spaces_with_windows().await.unwrap_or_default();
                    let _ = events.send(SpaceEvent::InitialState(spaces)).await;
                });
            }
        }
    }

    /// Switch to a space in the background; failures are only logged
    pub fn switch_to_space(&self, space: SpaceId, need_window_focus: bool) {
        let Some(provider) = self.provider.clone() else {
            debug!(space = %space, "No backend to switch spaces with");
            return;
        };
        tokio::spawn(async move { provider.focus_space(&space, need_window_focus).await });
    }

    /// Focus a window in the background; failures are only logged
    pub fn switch_to_window(&self, window: u64) {
        let Some(provider) = self.provider.clone() else {
            debug!(window, "No backend to focus windows with");
            return;
        };
        tokio::spawn(async move { provider.focus_window(window).await });
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// Apply events in arrival order and republish after each one
async fn run_state_loop(mut events: EventReceiver, published: Arc<watch::Sender<Vec<Space>>>) {
    let mut state = SpaceState::default();

    while let Some(event) = events.recv().await {
        trace!(event = event.kind(), "Applying space event");
        state.apply(event);
        if state.publish(&published) {
            debug!(spaces = published.borrow().len(), "Published new space snapshot");
        }
    }

    debug!("Event channel closed, state task exiting");
}
