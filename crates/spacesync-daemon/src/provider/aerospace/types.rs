//! AeroSpace `--json` output and its conversion into the shared model

use serde::Deserialize;

use crate::model::{IconCache, Space, SpaceId, Window};

/// One entry of `aerospace list-workspaces --json`
#[derive(Debug, Clone, Deserialize)]
pub struct AerospaceWorkspace {
    pub workspace: String,
}

/// One entry of `aerospace list-windows --json`
///
/// Only the fields requested through `--format` are present, so everything
/// but the id is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AerospaceWindow {
    pub window_id: u64,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub window_title: String,
    #[serde(default)]
    pub workspace: Option<String>,
}

/// Join workspaces and windows into spaces
///
/// Workspaces keep listing order and windows keep discovery order. Empty
/// workspaces are dropped unless focused.
pub fn assemble_spaces(
    workspaces: Vec<AerospaceWorkspace>,
    windows: Vec<AerospaceWindow>,
    focused_workspace: Option<&str>,
    focused_window: Option<u64>,
    icons: Option<&dyn IconCache>,
) -> Vec<Space> {
    let mut spaces: Vec<Space> = workspaces
        .into_iter()
        .map(|w| {
            let is_focused = focused_workspace == Some(w.workspace.as_str());
            Space::new(SpaceId::from(w.workspace)).focused(is_focused)
        })
        .collect();

    for window in windows {
        let Some(workspace) = window.workspace.as_deref() else {
            continue;
        };
        let Some(space) = spaces.iter_mut().find(|s| s.id.as_str() == workspace) else {
            continue;
        };

        let mut converted = Window::new(window.window_id, window.window_title)
            .focused(focused_window == Some(window.window_id));
        if let Some(app_name) = window.app_name {
            converted = converted.with_app_name(app_name).with_icon_from(icons);
        }
        space.windows.push(converted);
    }

    spaces.retain(|s| s.is_focused || !s.windows.is_empty());
    spaces
}
