//! yabai CLI queries and commands

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::types::{assemble_spaces, tiled_windows, YabaiSpace, YabaiWindow};
use crate::model::{IconCache, Space, SpaceId, Window};
use crate::provider::{CommandRunner, ProviderError};

/// Cloneable handle for issuing `yabai -m` commands
///
/// Shared between the provider and its signal listener task.
#[derive(Clone)]
pub struct YabaiClient {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    icons: Option<Arc<dyn IconCache>>,
}

impl YabaiClient {
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

    /// Every non-empty space with its tiled windows
    ///
    /// Spaces and windows are queried separately and joined on space index.
    pub async fn spaces_with_windows(&self) -> Result<Vec<Space>, ProviderError> {
        let spaces: Vec<YabaiSpace> = self
            .query(&["-m", "query", "--spaces"], "yabai spaces")
            .await?;
        let windows: Vec<YabaiWindow> = self
            .query(&["-m", "query", "--windows"], "yabai windows")
            .await?;

        Ok(assemble_spaces(spaces, windows, self.icons.as_deref()))
    }

    /// Tiled windows of one space in stack order
    pub async fn space_windows(&self, space: &SpaceId) -> Result<Vec<Window>, ProviderError> {
        let windows: Vec<YabaiWindow> = self
            .query(
                &["-m", "query", "--windows", "--space", space.as_str()],
                "yabai space windows",
            )
            .await?;

        Ok(tiled_windows(windows, self.icons.as_deref()))
    }

    pub async fn focused_space(&self) -> Result<Option<SpaceId>, ProviderError> {
        let space: YabaiSpace = self
            .query(&["-m", "query", "--spaces", "--space"], "yabai space")
            .await?;
        Ok(Some(SpaceId::from(space.index)))
    }

    /// The focused window, if any
    ///
    /// yabai exits non-zero when nothing has focus, which is not an error here.
    pub async fn focused_window(&self) -> Result<Option<u64>, ProviderError> {
        let result: Result<YabaiWindow, _> = self
            .query(&["-m", "query", "--windows", "--window"], "yabai window")
            .await;
        match result {
            Ok(window) => Ok(Some(window.id)),
            Err(ProviderError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn focus_space(&self, space: &SpaceId) -> Result<(), ProviderError> {
        self.runner
            .run(&self.binary, &["-m", "space", "--focus", space.as_str()])
            .await
            .map(|_| ())
    }

    pub async fn focus_window(&self, window: u64) -> Result<(), ProviderError> {
        let window = window.to_string();
        self.runner
            .run(&self.binary, &["-m", "window", "--focus", &window])
            .await
            .map(|_| ())
    }
}
