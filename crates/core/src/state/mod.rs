//! In-memory session state.
//!
//! `AppState` is the explicit replacement for page-global progress
//! variables: one instance per session, owned by the orchestrator and
//! shared with UI handlers through [`SharedSession`].

mod apply;
mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use focusmode_domain::constants::{LofiCatalogEntry, PREMIUM_LOFI_CATALOG};
use focusmode_domain::{AuthUser, DailyFocus, Playlist, PowerUpState, Task, UserState};
use tokio::sync::RwLock;

/// Session shared between the orchestrator and UI handlers
pub type SharedSession = Arc<RwLock<Session>>;

/// A premium lofi track: static catalog data joined with the unlock flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LofiTrack {
    pub id: String,
    pub name: String,
    pub url: String,
    pub cost: u64,
    pub unlocked: bool,
}

impl From<&LofiCatalogEntry> for LofiTrack {
    fn from(entry: &LofiCatalogEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            url: entry.url.to_string(),
            cost: entry.cost,
            unlocked: false,
        }
    }
}

/// Progress data for the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub points: u64,
    pub previous_points: u64,
    pub total_focus_time: u64,
    pub total_distractions: u64,
    pub total_videos_watched: u64,
    pub tasks: Vec<Task>,
    pub playlists: Vec<Playlist>,
    pub streak_days: u32,
    pub last_focus_date: Option<NaiveDate>,
    pub mystery_box_count: u32,
    pub active_power_ups: PowerUpState,
    /// Locally-held catalog; only `unlocked` is synced.
    pub premium_lofi_tracks: Vec<LofiTrack>,
    pub daily_focus_data: BTreeMap<NaiveDate, DailyFocus>,
    pub browser_notifications_enabled: bool,
    pub current_pomodoro_duration_setting: u32,
    pub current_view: String,
}

impl Default for AppState {
    fn default() -> Self {
        let defaults = UserState::default();
        Self {
            points: defaults.points,
            previous_points: defaults.previous_points,
            total_focus_time: defaults.total_focus_time,
            total_distractions: defaults.total_distractions,
            total_videos_watched: defaults.total_videos_watched,
            tasks: defaults.tasks,
            playlists: defaults.playlists,
            streak_days: defaults.streak_days,
            last_focus_date: defaults.last_focus_date,
            mystery_box_count: defaults.mystery_box_count,
            active_power_ups: defaults.active_power_ups,
            premium_lofi_tracks: PREMIUM_LOFI_CATALOG.iter().map(LofiTrack::from).collect(),
            daily_focus_data: defaults.daily_focus_data,
            browser_notifications_enabled: defaults.browser_notifications_enabled,
            current_pomodoro_duration_setting: defaults.current_pomodoro_duration_setting,
            current_view: defaults.current_view,
        }
    }
}

impl AppState {
    pub fn track(&self, id: &str) -> Option<&LofiTrack> {
        self.premium_lofi_tracks.iter().find(|track| track.id == id)
    }
}

/// Auth-scoped wrapper around `AppState`
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: AppState,
    /// Signed-in identity; `None` when anonymous.
    pub user: Option<AuthUser>,
    /// Whether a remote load for `user` has completed. Saves are refused
    /// until it has, so stale local defaults never overwrite remote data.
    pub hydrated: bool,
}

impl Session {
    pub fn new(state: AppState) -> Self {
        Self { state, user: None, hydrated: false }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Record a new signed-in user. Hydration restarts for a different user.
    pub fn sign_in(&mut self, user: AuthUser) {
        if self.user_id() != Some(user.id.as_str()) {
            self.hydrated = false;
        }
        self.user = Some(user);
    }

    /// Clear the signed-in flag and user id. Progress stays in memory.
    pub fn sign_out(&mut self) {
        self.user = None;
        self.hydrated = false;
    }
}
