//! Backend-agnostic space and window model
//!
//! Every backend converts its native query output into these types. They
//! carry only what the presentation layer needs and compare by content, so
//! the synchronizer can tell whether a new snapshot actually differs from
//! the one it last published.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Backend-native space identifier
///
/// A mission-control index for yabai, a workspace name for AeroSpace. Both
/// are treated as opaque strings, ordered naturally: numeric ids compare by
/// value and sort before named ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits with leading zeros stripped, if the id is purely numeric
    fn numeric_key(&self) -> Option<&str> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = self.0.trim_start_matches('0');
        Some(if trimmed.is_empty() { "0" } else { trimmed })
    }
}

impl Ord for SpaceId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_key(), other.numeric_key()) {
            // Comparing digit strings by length first avoids overflow on huge ids
            (Some(a), Some(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.cmp(b))
                .then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SpaceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SpaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for SpaceId {
    fn from(index: u32) -> Self {
        Self(index.to_string())
    }
}

/// Opaque application icon handle
///
/// The image itself belongs to the external icon cache; windows only hold a
/// shared reference so the presentation layer can render it.
#[derive(Clone)]
pub struct AppIcon(Arc<dyn Any + Send + Sync>);

impl AppIcon {
    pub fn new<T: Any + Send + Sync>(image: T) -> Self {
        Self(Arc::new(image))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for AppIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppIcon(..)")
    }
}

/// Icon lookup provided by the host application
pub trait IconCache: Send + Sync {
    /// Icon for an application name, if one is cached or can be loaded
    fn icon_for(&self, app_name: &str) -> Option<AppIcon>;
}

/// A window reported by the window manager as belonging to a space
///
/// Equality ignores `app_icon`: an icon finishing loading must not look like
/// a state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub is_focused: bool,
    #[serde(skip)]
    pub app_icon: Option<AppIcon>,
}

impl Window {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            app_name: None,
            is_focused: false,
            app_icon: None,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn focused(mut self, is_focused: bool) -> Self {
        self.is_focused = is_focused;
        self
    }

    /// Resolve the icon for this window's application through `icons`
    pub fn with_icon_from(mut self, icons: Option<&dyn IconCache>) -> Self {
        if let (Some(cache), Some(app_name)) = (icons, self.app_name.as_deref()) {
            self.app_icon = cache.icon_for(app_name);
        }
        self
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.app_name == other.app_name
            && self.is_focused == other.is_focused
    }
}

impl Eq for Window {}

/// A virtual desktop and its windows, in backend-defined order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub is_focused: bool,
    pub windows: Vec<Window>,
}

impl Space {
    /// An unfocused space with no windows
    pub fn new(id: impl Into<SpaceId>) -> Self {
        Self {
            id: id.into(),
            is_focused: false,
            windows: Vec::new(),
        }
    }

    pub fn focused(mut self, is_focused: bool) -> Self {
        self.is_focused = is_focused;
        self
    }

    pub fn with_windows(mut self, windows: Vec<Window>) -> Self {
        self.windows = windows;
        self
    }

    pub fn focused_window(&self) -> Option<&Window> {
        self.windows.iter().find(|w| w.is_focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticIcons;

    impl IconCache for StaticIcons {
        fn icon_for(&self, app_name: &str) -> Option<AppIcon> {
            (app_name == "Safari").then(|| AppIcon::new("safari.png".to_string()))
        }
    }

    #[test]
    fn test_space_id_numeric_ordering() {
        let mut ids: Vec<SpaceId> = ["10", "2", "1", "web", "02", "code"]
            .into_iter()
            .map(SpaceId::from)
            .collect();
        ids.sort();

        let ordered: Vec<&str> = ids.iter().map(SpaceId::as_str).collect();
        assert_eq!(ordered, vec!["1", "02", "2", "10", "code", "web"]);
    }

    #[test]
    fn test_space_id_ordering_consistent_with_eq() {
        let a = SpaceId::from("01");
        let b = SpaceId::from("1");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_space_id_huge_numbers_do_not_overflow() {
        let small = SpaceId::from("99999999999999999999");
        let large = SpaceId::from("100000000000000000000");
        assert!(small < large);
    }

    #[test]
    fn test_window_equality_ignores_icon() {
        let plain = Window::new(1, "Docs").with_app_name("Safari");
        let with_icon = plain.clone().with_icon_from(Some(&StaticIcons));

        assert!(with_icon.app_icon.is_some());
        assert_eq!(plain, with_icon);
    }

    #[test]
    fn test_window_equality_covers_focus() {
        let a = Window::new(1, "Docs");
        let b = Window::new(1, "Docs").focused(true);
        assert_ne!(a, b);
    }

    #[test]
    fn test_icon_lookup_requires_app_name() {
        let window = Window::new(1, "untitled").with_icon_from(Some(&StaticIcons));
        assert!(window.app_icon.is_none());
    }

    #[test]
    fn test_icon_downcast() {
        let icon = AppIcon::new(42u32);
        assert_eq!(icon.downcast_ref::<u32>(), Some(&42));
        assert!(icon.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_space_serializes_without_icon() {
        let space = Space::new("1").focused(true).with_windows(vec![Window::new(7, "Term")
            .with_app_name("Alacritty")
            .with_icon_from(Some(&StaticIcons))]);

        let json = serde_json::to_string(&space).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","is_focused":true,"windows":[{"id":7,"title":"Term","app_name":"Alacritty","is_focused":false}]}"#
        );

        let parsed: Space = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, space);
    }

    #[test]
    fn test_focused_window() {
        let space = Space::new("3").with_windows(vec![
            Window::new(1, "a"),
            Window::new(2, "b").focused(true),
        ]);
        assert_eq!(space.focused_window().map(|w| w.id), Some(2));
        assert!(Space::new("4").focused_window().is_none());
    }
}
