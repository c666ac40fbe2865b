//! Incremental state changes flowing from backends into the synchronizer
//!
//! ```text
//! +----------------+      +---------+      +-------------+      +---------+
//! | signal socket  | ---> | backend | ---> | mpsc        | ---> | state   |
//! | or poll driver |      | adapter |      | channel     |      | task    |
//! +----------------+      +---------+      +-------------+      +---------+
//! ```
//!
//! Every change to canonical state is expressed as a `SpaceEvent` and
//! applied by a single task, in the order the events were sent.

use tokio::sync::mpsc;

use crate::model::{Space, SpaceId, Window};

/// Buffer size for the event channel between backends and the state task
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sending half handed to event sources
pub type EventSender = mpsc::Sender<SpaceEvent>;

/// Receiving half owned by the state task
pub type EventReceiver = mpsc::Receiver<SpaceEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceEvent {
    /// Replace all state with this full snapshot
    InitialState(Vec<Space>),
    /// The given space became the focused one
    FocusChanged(SpaceId),
    /// Replace the window list of one space
    WindowsUpdated { space: SpaceId, windows: Vec<Window> },
    /// A new, empty space appeared
    SpaceCreated(SpaceId),
    /// A space went away along with its windows
    SpaceDestroyed(SpaceId),
}

impl SpaceEvent {
    /// Short name for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitialState(_) => "initial_state",
            Self::FocusChanged(_) => "focus_changed",
            Self::WindowsUpdated { .. } => "windows_updated",
            Self::SpaceCreated(_) => "space_created",
            Self::SpaceDestroyed(_) => "space_destroyed",
        }
    }
}
