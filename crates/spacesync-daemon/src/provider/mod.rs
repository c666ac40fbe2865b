//! Window-manager backends
//!
//! Backends are described by capability rather than by a single fat trait:
//!
//! - [`SpacesProvider`]: full snapshot of spaces and windows (required)
//! - [`FocusAwareProvider`]: cheap lookups of the focused space and window
//! - [`SwitchableProvider`]: focus a space or a window
//! - [`EventBasedProvider`]: push change notifications instead of being polled
//!
//! [`AnyProvider`] bundles whichever capabilities a backend has behind one
//! handle, and the synchronizer only ever talks to that handle.

mod any;
mod error;
mod events;
mod factory;
mod runner;

pub mod aerospace;
pub mod yabai;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::model::{Space, SpaceId};

pub use any::AnyProvider;
pub use error::ProviderError;
pub use events::{EventReceiver, EventSender, SpaceEvent, DEFAULT_CHANNEL_BUFFER};
pub use factory::{create_provider, detect_backend, resolve_provider, PgrepProbe, ProcessProbe};
pub use runner::{CommandRunner, ProcessRunner};

#[async_trait]
pub trait SpacesProvider: Send + Sync {
    /// Query the window manager for every space and its windows
    async fn spaces_with_windows(&self) -> Result<Vec<Space>, ProviderError>;
}

#[async_trait]
pub trait FocusAwareProvider: Send + Sync {
    async fn focused_space_id(&self) -> Result<Option<SpaceId>, ProviderError>;

    async fn focused_window_id(&self) -> Result<Option<u64>, ProviderError>;
}

#[async_trait]
pub trait SwitchableProvider: Send + Sync {
    async fn focus_space(&self, space: &SpaceId) -> Result<(), ProviderError>;

    async fn focus_window(&self, window: u64) -> Result<(), ProviderError>;
}

/// A backend that pushes changes instead of being polled
#[async_trait]
pub trait EventBasedProvider: Send + Sync {
    /// Send a full `InitialState` through `events`, then keep sending
    /// incremental events until [`stop_observing`](Self::stop_observing).
    ///
    /// Failures are logged rather than returned: a listener that could not
    /// start simply never sends anything after the initial snapshot.
    async fn start_observing(&self, events: EventSender);

    /// Stop the listener and release its resources. Safe to call repeatedly.
    fn stop_observing(&self);

    /// Whether a listener is currently receiving notifications
    fn is_listening(&self) -> bool;

    /// Queue a full re-query behind any events the listener already has
    ///
    /// Returns `false` when no listener is running to take the request.
    fn request_refresh(&self) -> bool;
}
