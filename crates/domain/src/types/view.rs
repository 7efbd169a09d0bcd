//! UI view tokens handed to the external view router.

use serde::{Deserialize, Serialize};

use crate::impl_tag_conversions;

/// A top-level screen of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Anonymous landing view.
    Welcome,
    /// Authenticated landing view.
    Dashboard,
    Focus,
    Pomodoro,
    Tasks,
    Playlists,
    Stats,
    Store,
    Settings,
}

impl_tag_conversions!(View {
    Welcome => "welcome",
    Dashboard => "dashboard",
    Focus => "focus",
    Pomodoro => "pomodoro",
    Tasks => "tasks",
    Playlists => "playlists",
    Stats => "stats",
    Store => "store",
    Settings => "settings",
});

impl View {
    /// Whether the view requires a signed-in user.
    pub const fn requires_auth(self) -> bool {
        !matches!(self, Self::Welcome)
    }
}
