//! Load-side view of a persisted document.
//!
//! Every field is optional: documents written by older clients, hand edits
//! or a half-migrated row may carry any subset of the fields. `null` and a
//! missing key mean the same thing. Coalescing against local state happens
//! in the applier, not here.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient;
use super::state::{
    DailyFocus, DoublePoints, LofiTrackUnlock, Playlist, PowerUpState, StreakShield, Task,
    UserState,
};

/// Partial `UserState` as read from a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteUserState {
    #[serde(deserialize_with = "lenient::optional_count")]
    pub points: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub previous_points: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub total_focus_time: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub total_distractions: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub total_videos_watched: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_items")]
    pub tasks: Option<Vec<Task>>,
    #[serde(deserialize_with = "lenient::optional_items")]
    pub playlists: Option<Vec<Playlist>>,
    #[serde(deserialize_with = "lenient::optional_small_count")]
    pub streak_days: Option<u32>,
    #[serde(deserialize_with = "lenient::date")]
    pub last_focus_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::optional_small_count")]
    pub mystery_box_count: Option<u32>,
    #[serde(deserialize_with = "lenient::optional_object")]
    pub active_power_ups: Option<RemotePowerUpState>,
    #[serde(deserialize_with = "lenient::optional_items")]
    pub premium_lofi_tracks: Option<Vec<LofiTrackUnlock>>,
    #[serde(deserialize_with = "lenient::daily_focus")]
    pub daily_focus_data: Option<BTreeMap<NaiveDate, DailyFocus>>,
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub browser_notifications_enabled: Option<bool>,
    #[serde(deserialize_with = "lenient::optional_small_count")]
    pub current_pomodoro_duration_setting: Option<u32>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub current_view: Option<String>,
}

/// Partial power-up state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemotePowerUpState {
    #[serde(deserialize_with = "lenient::optional_object")]
    pub double_points: Option<RemoteDoublePoints>,
    #[serde(deserialize_with = "lenient::optional_object")]
    pub streak_shield: Option<RemoteStreakShield>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteDoublePoints {
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub active: Option<bool>,
    #[serde(deserialize_with = "lenient::optional_timestamp")]
    pub expiry: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStreakShield {
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub active: Option<bool>,
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub used: Option<bool>,
    #[serde(deserialize_with = "lenient::optional_timestamp")]
    pub expiry: Option<i64>,
}

impl RemoteUserState {
    /// True when the document carried no recognised field at all.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<UserState> for RemoteUserState {
    fn from(state: UserState) -> Self {
        Self {
            points: Some(state.points),
            previous_points: Some(state.previous_points),
            total_focus_time: Some(state.total_focus_time),
            total_distractions: Some(state.total_distractions),
            total_videos_watched: Some(state.total_videos_watched),
            tasks: Some(state.tasks),
            playlists: Some(state.playlists),
            streak_days: Some(state.streak_days),
            last_focus_date: state.last_focus_date,
            mystery_box_count: Some(state.mystery_box_count),
            active_power_ups: Some(state.active_power_ups.into()),
            premium_lofi_tracks: Some(state.premium_lofi_tracks),
            daily_focus_data: Some(state.daily_focus_data),
            browser_notifications_enabled: Some(state.browser_notifications_enabled),
            current_pomodoro_duration_setting: Some(state.current_pomodoro_duration_setting),
            current_view: Some(state.current_view),
        }
    }
}

impl From<PowerUpState> for RemotePowerUpState {
    fn from(power_ups: PowerUpState) -> Self {
        let PowerUpState { double_points, streak_shield } = power_ups;
        Self {
            double_points: Some(RemoteDoublePoints {
                active: Some(double_points.active),
                expiry: double_points.expiry,
            }),
            streak_shield: Some(RemoteStreakShield {
                active: Some(streak_shield.active),
                used: Some(streak_shield.used),
                expiry: streak_shield.expiry,
            }),
        }
    }
}

impl RemoteDoublePoints {
    /// Coalesce onto a local value.
    pub fn merge_into(&self, local: &DoublePoints) -> DoublePoints {
        DoublePoints {
            active: self.active.unwrap_or(local.active),
            expiry: self.expiry.or(local.expiry),
        }
    }
}

impl RemoteStreakShield {
    /// Coalesce onto a local value.
    pub fn merge_into(&self, local: &StreakShield) -> StreakShield {
        StreakShield {
            active: self.active.unwrap_or(local.active),
            used: self.used.unwrap_or(local.used),
            expiry: self.expiry.or(local.expiry),
        }
    }
}
