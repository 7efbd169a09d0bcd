//! Snapshot Builder: `AppState` -> `UserState`.

use focusmode_domain::constants::{MAX_POMODORO_MINUTES, MIN_POMODORO_MINUTES};
use focusmode_domain::{LofiTrackUnlock, UserState};

use super::AppState;

impl AppState {
    /// Assemble the persisted record from the current session state.
    ///
    /// The result is always fully populated; it never depends on what was
    /// last loaded.
    pub fn snapshot(&self) -> UserState {
        UserState {
            points: self.points,
            previous_points: self.previous_points,
            total_focus_time: self.total_focus_time,
            total_distractions: self.total_distractions,
            total_videos_watched: self.total_videos_watched,
            tasks: self.tasks.clone(),
            playlists: self.playlists.clone(),
            streak_days: self.streak_days,
            last_focus_date: self.last_focus_date,
            mystery_box_count: self.mystery_box_count,
            active_power_ups: self.active_power_ups.clone(),
            premium_lofi_tracks: self
                .premium_lofi_tracks
                .iter()
                .map(|track| LofiTrackUnlock { id: track.id.clone(), unlocked: track.unlocked })
                .collect(),
            daily_focus_data: self.daily_focus_data.clone(),
            browser_notifications_enabled: self.browser_notifications_enabled,
            current_pomodoro_duration_setting: self
                .current_pomodoro_duration_setting
                .clamp(MIN_POMODORO_MINUTES, MAX_POMODORO_MINUTES),
            current_view: self.current_view.clone(),
        }
    }
}
