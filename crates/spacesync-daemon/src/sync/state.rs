//! Canonical space state and event application

use std::collections::BTreeMap;

use tokio::sync::watch;

use crate::model::{Space, SpaceId};
use crate::provider::SpaceEvent;

/// Spaces keyed by id
///
/// Owned by the state task alone; everything else sees the published
/// snapshot. The map keeps ids in natural order, so snapshots come out
/// sorted without extra work.
///
/// A push backend leaves empty spaces out of its snapshots, so focus can
/// land on a space the map does not hold. The last announced focus is kept
/// in `focused` and applied when that space gets its first windows.
#[derive(Debug, Default)]
pub struct SpaceState {
    spaces: BTreeMap<SpaceId, Space>,
    focused: Option<SpaceId>,
}

impl SpaceState {
    pub fn apply(&mut self, event: SpaceEvent) {
        match event {
            SpaceEvent::InitialState(spaces) => {
                self.spaces = spaces.into_iter().map(|s| (s.id.clone(), s)).collect();
                match self.spaces.values().find(|s| s.is_focused) {
                    Some(space) => self.focused = Some(space.id.clone()),
                    // Focus may sit on an empty space the snapshot left out
                    None => {
                        if self
                            .focused
                            .as_ref()
                            .is_some_and(|id| self.spaces.contains_key(id))
                        {
                            self.focused = None;
                        }
                    }
                }
            }
            SpaceEvent::FocusChanged(focused) => {
                // An unknown id leaves every space unfocused
                for (id, space) in self.spaces.iter_mut() {
                    space.is_focused = *id == focused;
                }
                self.focused = Some(focused);
            }
            SpaceEvent::WindowsUpdated { space, windows } => {
                if windows.is_empty() {
                    // Same as a full query, which drops spaces without windows
                    self.spaces.remove(&space);
                } else if let Some(existing) = self.spaces.get_mut(&space) {
                    existing.windows = windows;
                } else {
                    let is_focused = self.focused.as_ref() == Some(&space);
                    self.spaces.insert(
                        space.clone(),
                        Space::new(space).focused(is_focused).with_windows(windows),
                    );
                }
            }
            SpaceEvent::SpaceCreated(id) => {
                self.spaces
                    .entry(id.clone())
                    .or_insert_with(|| Space::new(id));
            }
            SpaceEvent::SpaceDestroyed(id) => {
                self.spaces.remove(&id);
                if self.focused.as_ref() == Some(&id) {
                    self.focused = None;
                }
            }
        }
    }

    /// Spaces sorted by id
    pub fn snapshot(&self) -> Vec<Space> {
        self.spaces.values().cloned().collect()
    }

    /// Replace the published snapshot if it differs from the current state
    ///
    /// Returns whether subscribers were notified.
    pub fn publish(&self, published: &watch::Sender<Vec<Space>>) -> bool {
        let snapshot = self.snapshot();
        published.send_if_modified(move |current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Window;

    fn state_with(spaces: Vec<Space>) -> SpaceState {
        let mut state = SpaceState::default();
        state.apply(SpaceEvent::InitialState(spaces));
        state
    }

    fn focused_ids(state: &SpaceState) -> Vec<String> {
        state
            .snapshot()
            .into_iter()
            .filter(|s| s.is_focused)
            .map(|s| s.id.to_string())
            .collect()
    }

    #[test]
    fn test_initial_state_replaces_everything() {
        let mut state = state_with(vec![Space::new("1"), Space::new("2")]);
        state.apply(SpaceEvent::InitialState(vec![Space::new("3")]));

        let ids: Vec<String> = state.snapshot().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn test_snapshot_is_sorted_naturally() {
        let state = state_with(vec![Space::new("10"), Space::new("web"), Space::new("2")]);
        let ids: Vec<String> = state.snapshot().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["2", "10", "web"]);
    }

    #[test]
    fn test_focus_changed_moves_focus_only() {
        let windows = vec![Window::new(1, "a").focused(true)];
        let mut state = state_with(vec![
            Space::new("1").focused(true).with_windows(windows.clone()),
            Space::new("2"),
        ]);

        state.apply(SpaceEvent::FocusChanged(SpaceId::from("2")));

        assert_eq!(focused_ids(&state), vec!["2"]);
        assert_eq!(state.snapshot()[0].windows, windows);
    }

    #[test]
    fn test_focus_changed_unknown_unfocuses_all() {
        let mut state = state_with(vec![Space::new("1").focused(true), Space::new("2")]);
        state.apply(SpaceEvent::FocusChanged(SpaceId::from("9")));

        assert!(focused_ids(&state).is_empty());
        assert_eq!(state.snapshot().len(), 2);
    }

    #[test]
    fn test_windows_updated_touches_one_space() {
        let untouched = vec![Window::new(10, "keep")];
        let mut state = state_with(vec![
            Space::new("1").focused(true).with_windows(vec![Window::new(1, "old")]),
            Space::new("2").with_windows(untouched.clone()),
        ]);

        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("1"),
            windows: vec![Window::new(2, "new"), Window::new(3, "newer")],
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot[0].windows.iter().map(|w| w.id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(snapshot[0].is_focused);
        assert_eq!(snapshot[1].windows, untouched);
    }

    #[test]
    fn test_windows_updated_adds_space_left_out_while_empty() {
        let mut state = state_with(vec![Space::new("1")]);
        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("5"),
            windows: vec![Window::new(1, "a")],
        });

        assert_eq!(
            state.snapshot(),
            vec![
                Space::new("1"),
                Space::new("5").with_windows(vec![Window::new(1, "a")]),
            ]
        );
    }

    #[test]
    fn test_empty_focused_space_gets_first_window() {
        let mut state = state_with(vec![
            Space::new("1").focused(true).with_windows(vec![Window::new(1, "a")]),
        ]);

        state.apply(SpaceEvent::FocusChanged(SpaceId::from("2")));
        assert!(focused_ids(&state).is_empty());

        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("2"),
            windows: vec![Window::new(21, "new")],
        });

        assert_eq!(focused_ids(&state), vec!["2"]);
        assert_eq!(state.snapshot()[1].windows, vec![Window::new(21, "new")]);
        assert!(!state.snapshot()[0].is_focused);
    }

    #[test]
    fn test_focus_on_empty_space_survives_full_snapshot() {
        let mut state = state_with(vec![Space::new("1").focused(true)]);
        state.apply(SpaceEvent::FocusChanged(SpaceId::from("2")));

        // A full query while on the empty space reports no focused space
        state.apply(SpaceEvent::InitialState(vec![Space::new("1")]));
        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("2"),
            windows: vec![Window::new(21, "new")],
        });

        assert_eq!(focused_ids(&state), vec!["2"]);
    }

    #[test]
    fn test_snapshot_without_focus_clears_stale_focus() {
        let mut state = state_with(vec![Space::new("1").focused(true), Space::new("2")]);
        state.apply(SpaceEvent::InitialState(vec![Space::new("1"), Space::new("2")]));
        state.apply(SpaceEvent::SpaceDestroyed(SpaceId::from("1")));
        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("1"),
            windows: vec![Window::new(1, "a")],
        });

        assert!(focused_ids(&state).is_empty());
    }

    #[test]
    fn test_windows_updated_empty_list_drops_space() {
        let mut state = state_with(vec![
            Space::new("1").with_windows(vec![Window::new(1, "a")]),
            Space::new("2").with_windows(vec![Window::new(2, "b")]),
        ]);
        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("1"),
            windows: Vec::new(),
        });
        state.apply(SpaceEvent::WindowsUpdated {
            space: SpaceId::from("9"),
            windows: Vec::new(),
        });

        assert_eq!(
            state.snapshot(),
            vec![Space::new("2").with_windows(vec![Window::new(2, "b")])]
        );
    }

    #[test]
    fn test_space_created_is_empty_and_unfocused() {
        let mut state = state_with(vec![Space::new("1").focused(true)]);
        state.apply(SpaceEvent::SpaceCreated(SpaceId::from("4")));

        assert_eq!(state.snapshot()[1], Space::new("4"));
    }

    #[test]
    fn test_space_created_keeps_existing() {
        let existing = Space::new("1").with_windows(vec![Window::new(1, "a")]);
        let mut state = state_with(vec![existing.clone()]);
        state.apply(SpaceEvent::SpaceCreated(SpaceId::from("1")));

        assert_eq!(state.snapshot(), vec![existing]);
    }

    #[test]
    fn test_space_destroyed_removes_windows_too() {
        let mut state = state_with(vec![
            Space::new("1").with_windows(vec![Window::new(1, "a")]),
            Space::new("2"),
        ]);
        state.apply(SpaceEvent::SpaceDestroyed(SpaceId::from("1")));
        state.apply(SpaceEvent::SpaceDestroyed(SpaceId::from("7")));

        assert_eq!(state.snapshot(), vec![Space::new("2")]);
    }

    #[test]
    fn test_publish_only_on_change() {
        let (tx, rx) = watch::channel(Vec::new());
        let mut state = state_with(vec![Space::new("1"), Space::new("2")]);

        assert!(state.publish(&tx));
        assert!(!state.publish(&tx));

        state.apply(SpaceEvent::FocusChanged(SpaceId::from("2")));
        assert!(state.publish(&tx));

        // Same focus again is not a change
        state.apply(SpaceEvent::FocusChanged(SpaceId::from("2")));
        assert!(!state.publish(&tx));

        assert_eq!(focused_ids(&state), vec!["2"]);
        assert_eq!(rx.borrow().len(), 2);
    }

    #[test]
    fn test_empty_state_publishes_nothing_new() {
        let (tx, _rx) = watch::channel(Vec::new());
        let state = SpaceState::default();
        assert!(!state.publish(&tx));
    }
}
