//! yabai query output and its conversion into the shared model

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::model::{IconCache, Space, Window};

/// One entry of `yabai -m query --spaces`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct YabaiSpace {
    /// Mission-control index, used as the space id
    pub index: u32,
    #[serde(default)]
    pub has_focus: bool,
}

/// One entry of `yabai -m query --windows`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct YabaiWindow {
    pub id: u64,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Index of the owning space
    pub space: u32,
    #[serde(default)]
    pub stack_index: u32,
    #[serde(default)]
    pub has_focus: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_floating: bool,
    #[serde(default)]
    pub is_sticky: bool,
}

impl YabaiWindow {
    /// Hidden, floating and sticky windows are not part of a space's layout
    pub fn is_tiled(&self) -> bool {
        !(self.is_hidden || self.is_floating || self.is_sticky)
    }

    fn into_window(self, icons: Option<&dyn IconCache>) -> Window {
        let window = Window::new(self.id, self.title).focused(self.has_focus);
        match self.app {
            Some(app) => window.with_app_name(app).with_icon_from(icons),
            None => window,
        }
    }
}

/// Tiled windows in stack order
///
/// The sort is stable, so windows sharing a stack index keep query order.
pub fn tiled_windows(windows: Vec<YabaiWindow>, icons: Option<&dyn IconCache>) -> Vec<Window> {
    let mut tiled: Vec<YabaiWindow> = windows.into_iter().filter(YabaiWindow::is_tiled).collect();
    tiled.sort_by_key(|w| w.stack_index);
    tiled.into_iter().map(|w| w.into_window(icons)).collect()
}

/// Group windows under their spaces, dropping spaces left without windows
///
/// Windows on an index the space query did not report are discarded.
pub fn assemble_spaces(
    spaces: Vec<YabaiSpace>,
    windows: Vec<YabaiWindow>,
    icons: Option<&dyn IconCache>,
) -> Vec<Space> {
    let mut by_index: BTreeMap<u32, (bool, Vec<YabaiWindow>)> = spaces
        .into_iter()
        .map(|s| (s.index, (s.has_focus, Vec::new())))
        .collect();

    for window in windows {
        if let Some((_, owned)) = by_index.get_mut(&window.space) {
            owned.push(window);
        }
    }

    by_index
        .into_iter()
        .filter_map(|(index, (has_focus, owned))| {
            let windows = tiled_windows(owned, icons);
            (!windows.is_empty()).then(|| {
                Space::new(index)
                    .focused(has_focus)
                    .with_windows(windows)
            })
        })
        .collect()
}
