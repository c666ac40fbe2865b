//! AeroSpace backend
//!
//! AeroSpace has no event stream the daemon can subscribe to, so this backend
//! only answers queries and commands; the synchronizer polls it.

mod types;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use types::{AerospaceWindow, AerospaceWorkspace};

use super::{CommandRunner, FocusAwareProvider, ProviderError, SpacesProvider, SwitchableProvider};
use crate::model::{IconCache, Space, SpaceId};

/// Fields requested for every window in the full query
const WINDOW_FORMAT: &str = "%{window-id}%{app-name}%{window-title}%{workspace}";

pub struct AerospaceProvider {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    icons: Option<Arc<dyn IconCache>>,
}

impl AerospaceProvider {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        binary: impl Into<String>,
        icons: Option<Arc<dyn IconCache>>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            icons,
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        args: &[&str],
        what: &'static str,
    ) -> Result<T, ProviderError> {
        let output = self.runner.run(&self.binary, args).await?;
        serde_json::from_str(&output)
            .map_err(|source| ProviderError::DeserializeFailed { what, source })
    }

    async fn all_workspaces(&self) -> Result<Vec<AerospaceWorkspace>, ProviderError> {
        self.query(&["list-workspaces", "--all", "--json"], "aerospace workspaces")
            .await
    }

    async fn focused_workspace(&self) -> Result<Option<String>, ProviderError> {
        let focused: Vec<AerospaceWorkspace> = self
            .query(
                &["list-workspaces", "--focused", "--json"],
                "aerospace focused workspace",
            )
            .await?;
        Ok(focused.into_iter().next().map(|w| w.workspace))
    }

    async fn all_windows(&self) -> Result<Vec<AerospaceWindow>, ProviderError> {
        self.query(
            &["list-windows", "--all", "--json", "--format", WINDOW_FORMAT],
            "aerospace windows",
        )
        .await
    }

    async fn focused_window(&self) -> Result<Option<u64>, ProviderError> {
        let focused: Vec<AerospaceWindow> = self
            .query(
                &["list-windows", "--focused", "--json"],
                "aerospace focused window",
            )
            .await?;
        Ok(focused.into_iter().next().map(|w| w.window_id))
    }
}

#[async_trait]
impl SpacesProvider for AerospaceProvider {
    async fn spaces_with_windows(&self) -> Result<Vec<Space>, ProviderError> {
        let (workspaces, focused_workspace, windows, focused_window) = tokio::join!(
            self.all_workspaces(),
            self.focused_workspace(),
            self.all_windows(),
            self.focused_window(),
        );

        // Nothing focused (e.g. an empty workspace) is not an error
        let focused_window = focused_window.unwrap_or_else(|e| {
            debug!(error = %e, "No focused AeroSpace window");
            None
        });

        Ok(types::assemble_spaces(
            workspaces?,
            windows?,
            focused_workspace?.as_deref(),
            focused_window,
            self.icons.as_deref(),
        ))
    }
}

#[async_trait]
impl FocusAwareProvider for AerospaceProvider {
    async fn focused_space_id(&self) -> Result<Option<SpaceId>, ProviderError> {
        Ok(self.focused_workspace().await?.map(SpaceId::from))
    }

    async fn focused_window_id(&self) -> Result<Option<u64>, ProviderError> {
        self.focused_window().await
    }
}

#[async_trait]
impl SwitchableProvider for AerospaceProvider {
    async fn focus_space(&self, space: &SpaceId) -> Result<(), ProviderError> {
        self.runner
            .run(&self.binary, &["workspace", space.as_str()])
            .await
            .map(|_| ())
    }

    async fn focus_window(&self, window: u64) -> Result<(), ProviderError> {
        let window = window.to_string();
        self.runner
            .run(&self.binary, &["focus", "--window-id", &window])
            .await
            .map(|_| ())
    }
}
