//! spacesync daemon library
//!
//! Keeps a live, backend-agnostic picture of window-manager spaces and their
//! windows, and serves it over a control socket.

pub mod ipc;
pub mod model;
pub mod provider;
pub mod sync;

pub use model::{AppIcon, IconCache, Space, SpaceId, Window};
pub use sync::{MonitoringState, Strategy, SyncSettings, Synchronizer};
