//! Test doubles for backends

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    CommandRunner, EventBasedProvider, EventSender, FocusAwareProvider, ProviderError,
    SpaceEvent, SpacesProvider, SwitchableProvider,
};
use crate::model::{Space, SpaceId};

/// Replays canned stdout keyed by the full command line
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, Option<String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(program: &str, args: &[&str]) -> String {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `command` is the program and its arguments joined by single spaces
    pub fn respond(&self, command: &str, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Some(stdout.to_string()));
    }

    pub fn fail(&self, command: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), None);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProviderError> {
        let key = Self::key(program, args);
        self.calls.lock().unwrap().push(key.clone());

        match self.responses.lock().unwrap().get(&key) {
            Some(Some(stdout)) => Ok(stdout.clone()),
            Some(None) => Err(ProviderError::CommandFailed {
                program: program.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "scripted failure".to_string(),
            }),
            None => Err(ProviderError::CommandFailed {
                program: program.to_string(),
                status: "exit status: 127".to_string(),
                stderr: format!("unscripted command: {}", key),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusCall {
    Space(SpaceId),
    Window(u64),
}

/// In-memory backend with every capability
///
/// Event support is driven by hand through [`FakeProvider::emit`].
pub struct FakeProvider {
    spaces: Mutex<Vec<Space>>,
    failing: AtomicBool,
    queries: AtomicUsize,
    focus_calls: Mutex<Vec<FocusCall>>,
    events: Mutex<Option<EventSender>>,
}

impl FakeProvider {
    pub fn new(spaces: Vec<Space>) -> Self {
        Self {
            spaces: Mutex::new(spaces),
            failing: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
            focus_calls: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        }
    }

    pub fn set_spaces(&self, spaces: Vec<Space>) {
        *self.spaces.lock().unwrap() = spaces;
    }

    pub fn fail_queries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn focus_calls(&self) -> Vec<FocusCall> {
        self.focus_calls.lock().unwrap().clone()
    }

    /// Push an event as if the window manager had reported it
    pub async fn emit(&self, event: SpaceEvent) {
        let sender = self.events.lock().unwrap().clone();
        if let Some(sender) = sender {
            sender.send(event).await.unwrap();
        }
    }
}

#[async_trait]
impl SpacesProvider for FakeProvider {
    async fn spaces_with_windows(&self) -> Result<Vec<Space>, ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::CommandFailed {
                program: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "query failed".to_string(),
            });
        }
        Ok(self.spaces.lock().unwrap().clone())
    }
}

#[async_trait]
impl FocusAwareProvider for FakeProvider {
    async fn focused_space_id(&self) -> Result<Option<SpaceId>, ProviderError> {
        let spaces = self.spaces.lock().unwrap();
        Ok(spaces.iter().find(|s| s.is_focused).map(|s| s.id.clone()))
    }

    async fn focused_window_id(&self) -> Result<Option<u64>, ProviderError> {
        let spaces = self.spaces.lock().unwrap();
        Ok(spaces
            .iter()
            .flat_map(|s| s.windows.iter())
            .find(|w| w.is_focused)
            .map(|w| w.id))
    }
}

#[async_trait]
impl SwitchableProvider for FakeProvider {
    async fn focus_space(&self, space: &SpaceId) -> Result<(), ProviderError> {
        self.focus_calls
            .lock()
            .unwrap()
            .push(FocusCall::Space(space.clone()));
        Ok(())
    }

    async fn focus_window(&self, window: u64) -> Result<(), ProviderError> {
        self.focus_calls
            .lock()
            .unwrap()
            .push(FocusCall::Window(window));
        Ok(())
    }
}

#[async_trait]
impl EventBasedProvider for FakeProvider {
    async fn start_observing(&self, events: EventSender) {
        let initial = self.spaces.lock().unwrap().clone();
        if events.send(SpaceEvent::InitialState(initial)).await.is_ok() {
            *self.events.lock().unwrap() = Some(events);
        }
    }

    fn stop_observing(&self) {
        self.events.lock().unwrap().take();
    }

    fn is_listening(&self) -> bool {
        self.events.lock().unwrap().is_some()
    }

    fn request_refresh(&self) -> bool {
        let spaces = self.spaces.lock().unwrap().clone();
        match self.events.lock().unwrap().as_ref() {
            Some(events) => events.try_send(SpaceEvent::InitialState(spaces)).is_ok(),
            None => false,
        }
    }
}
