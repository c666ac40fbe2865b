//! Uniform façade over a backend's optional capabilities

use std::sync::Arc;
use std::time::Duration;

use spacesync_config::{BackendKind, DEFAULT_FOCUS_SETTLE_MS};
use tracing::{debug, warn};

use super::{
    EventBasedProvider, EventSender, FocusAwareProvider, SpacesProvider, SwitchableProvider,
};
use crate::model::{Space, SpaceId};

/// One handle for whatever a backend supports
///
/// Missing capabilities degrade to no-ops or `None`, and backend errors are
/// logged here, so callers never branch on the concrete backend.
pub struct AnyProvider {
    kind: BackendKind,
    spaces: Arc<dyn SpacesProvider>,
    focus: Option<Arc<dyn FocusAwareProvider>>,
    switch: Option<Arc<dyn SwitchableProvider>>,
    events: Option<Arc<dyn EventBasedProvider>>,
    focus_settle: Duration,
}

impl AnyProvider {
    /// A façade with only the required snapshot capability
    pub fn new(kind: BackendKind, spaces: Arc<dyn SpacesProvider>) -> Self {
        Self {
            kind,
            spaces,
            focus: None,
            switch: None,
            events: None,
            focus_settle: Duration::from_millis(DEFAULT_FOCUS_SETTLE_MS),
        }
    }

    pub fn with_focus_awareness(mut self, focus: Arc<dyn FocusAwareProvider>) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_focus_control(mut self, switch: Arc<dyn SwitchableProvider>) -> Self {
        self.switch = Some(switch);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventBasedProvider>) -> Self {
        self.events = Some(events);
        self
    }

    /// Delay between switching space and checking whether a window got focus
    pub fn with_focus_settle(mut self, focus_settle: Duration) -> Self {
        self.focus_settle = focus_settle;
        self
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_event_based(&self) -> bool {
        self.events.is_some()
    }

    /// Full snapshot, or `None` if the backend query failed
    pub async fn get_spaces_with_windows(&self) -> Option<Vec<Space>> {
        match self.spaces.spaces_with_windows().await {
            Ok(spaces) => Some(spaces),
            Err(e) => {
                warn!(backend = %self.kind, error = %e, "Failed to query spaces");
                None
            }
        }
    }

    pub async fn focused_space_id(&self) -> Option<SpaceId> {
        let focus = self.focus.as_ref()?;
        focus.focused_space_id().await.unwrap_or_else(|e| {
            warn!(backend = %self.kind, error = %e, "Failed to query focused space");
            None
        })
    }

    pub async fn focused_window_id(&self) -> Option<u64> {
        let focus = self.focus.as_ref()?;
        focus.focused_window_id().await.unwrap_or_else(|e| {
            warn!(backend = %self.kind, error = %e, "Failed to query focused window");
            None
        })
    }

    /// Switch to `space`; with `need_window_focus`, also make sure one of its
    /// windows ends up focused.
    ///
    /// After the settle delay the space is re-queried, and if none of its
    /// windows has focus the first one in backend order is focused.
    pub async fn focus_space(&self, space: &SpaceId, need_window_focus: bool) {
        let Some(switch) = &self.switch else {
            debug!(backend = %self.kind, "Backend cannot switch spaces, ignoring request");
            return;
        };

        if let Err(e) = switch.focus_space(space).await {
            warn!(backend = %self.kind, space = %space, error = %e, "Failed to focus space");
            return;
        }

        if !need_window_focus {
            return;
        }

        tokio::time::sleep(self.focus_settle).await;

        let Some(spaces) = self.get_spaces_with_windows().await else {
            return;
        };
        let Some(target) = spaces.iter().find(|s| &s.id == space) else {
            debug!(space = %space, "Focused space has no windows to focus");
            return;
        };
        if target.focused_window().is_some() {
            return;
        }
        if let Some(first) = target.windows.first() {
            debug!(space = %space, window = first.id, "Focusing first window of space");
            if let Err(e) = switch.focus_window(first.id).await {
                warn!(backend = %self.kind, window = first.id, error = %e, "Failed to focus window");
            }
        }
    }

    pub async fn focus_window(&self, window: u64) {
        let Some(switch) = &self.switch else {
            debug!(backend = %self.kind, "Backend cannot focus windows, ignoring request");
            return;
        };

        if let Err(e) = switch.focus_window(window).await {
            warn!(backend = %self.kind, window, error = %e, "Failed to focus window");
        }
    }

    /// Start the push listener; a no-op for polled backends
    pub async fn start_observing(&self, events: EventSender) {
        match &self.events {
            Some(observer) => observer.start_observing(events).await,
            None => debug!(backend = %self.kind, "Backend does not push events"),
        }
    }

    pub fn stop_observing(&self) {
        if let Some(observer) = &self.events {
            observer.stop_observing();
        }
    }

    pub fn is_listening(&self) -> bool {
        self.events.as_ref().is_some_and(|e| e.is_listening())
    }

    /// Ask the push listener for an in-order full re-query
    pub fn request_refresh(&self) -> bool {
        self.events.as_ref().is_some_and(|e| e.request_refresh())
    }
}

impl std::fmt::Debug for AnyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyProvider")
            .field("kind", &self.kind)
            .field("focus_aware", &self.focus.is_some())
            .field("switchable", &self.switch.is_some())
            .field("event_based", &self.events.is_some())
            .field("focus_settle", &self.focus_settle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Window;
    use crate::provider::testing::{FakeProvider, FocusCall};

    fn full(fake: &Arc<FakeProvider>) -> AnyProvider {
        AnyProvider::new(BackendKind::Aerospace, fake.clone())
            .with_focus_awareness(fake.clone())
            .with_focus_control(fake.clone())
            .with_focus_settle(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_snapshot_only_provider_degrades() {
        let fake = Arc::new(FakeProvider::new(vec![Space::new("1").focused(true)]));
        let provider = AnyProvider::new(BackendKind::Aerospace, fake.clone());

        assert!(!provider.is_event_based());
        assert!(!provider.is_listening());
        assert_eq!(provider.focused_space_id().await, None);
        assert_eq!(provider.focused_window_id().await, None);

        provider.focus_space(&SpaceId::from("1"), true).await;
        provider.focus_window(3).await;
        assert!(fake.focus_calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_none() {
        let fake = Arc::new(FakeProvider::new(vec![]));
        fake.fail_queries(true);
        let provider = full(&fake);

        assert_eq!(provider.get_spaces_with_windows().await, None);
    }

    #[tokio::test]
    async fn test_focus_aware_lookups() {
        let fake = Arc::new(FakeProvider::new(vec![
            Space::new("1"),
            Space::new("2")
                .focused(true)
                .with_windows(vec![Window::new(20, "b").focused(true)]),
        ]));
        let provider = full(&fake);

        assert_eq!(provider.focused_space_id().await, Some(SpaceId::from("2")));
        assert_eq!(provider.focused_window_id().await, Some(20));
    }

    #[tokio::test]
    async fn test_focus_space_focuses_first_window_when_none_focused() {
        let fake = Arc::new(FakeProvider::new(vec![Space::new("2")
            .with_windows(vec![Window::new(21, "first"), Window::new(22, "second")])]));
        let provider = full(&fake);

        provider.focus_space(&SpaceId::from("2"), true).await;

        assert_eq!(
            fake.focus_calls(),
            vec![FocusCall::Space(SpaceId::from("2")), FocusCall::Window(21)]
        );
    }

    #[tokio::test]
    async fn test_focus_space_leaves_existing_window_focus() {
        let fake = Arc::new(FakeProvider::new(vec![Space::new("2").with_windows(vec![
            Window::new(21, "first"),
            Window::new(22, "second").focused(true),
        ])]));
        let provider = full(&fake);

        provider.focus_space(&SpaceId::from("2"), true).await;

        assert_eq!(fake.focus_calls(), vec![FocusCall::Space(SpaceId::from("2"))]);
    }

    #[tokio::test]
    async fn test_focus_space_without_window_focus() {
        let fake = Arc::new(FakeProvider::new(vec![
            Space::new("2").with_windows(vec![Window::new(21, "first")])
        ]));
        let provider = full(&fake);

        provider.focus_space(&SpaceId::from("2"), false).await;

        assert_eq!(fake.focus_calls(), vec![FocusCall::Space(SpaceId::from("2"))]);
        assert_eq!(fake.query_count(), 0);
    }

    #[tokio::test]
    async fn test_focus_space_empty_space_is_noop() {
        let fake = Arc::new(FakeProvider::new(vec![Space::new("1")]));
        let provider = full(&fake);

        provider.focus_space(&SpaceId::from("9"), true).await;

        assert_eq!(fake.focus_calls(), vec![FocusCall::Space(SpaceId::from("9"))]);
    }
}
