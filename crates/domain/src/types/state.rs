//! The persisted per-user record.
//!
//! `UserState` is always fully populated: every field carries an explicit
//! default so a snapshot can be written to either backend without holes.
//! Field names serialize in identifier style (`totalFocusTime`); see
//! [`crate::schema`] for the underscore-separated column layout.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_POMODORO_MINUTES, DEFAULT_VIEW, PREMIUM_LOFI_CATALOG, TASK_POINTS_EASY,
    TASK_POINTS_HARD, TASK_POINTS_MEDIUM, TASK_POINTS_UNRATED,
};
use crate::impl_tag_conversions;

/// Single persisted record of a user's progress data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserState {
    pub points: u64,
    pub previous_points: u64,
    /// Cumulative focused seconds.
    pub total_focus_time: u64,
    pub total_distractions: u64,
    pub total_videos_watched: u64,
    pub tasks: Vec<Task>,
    pub playlists: Vec<Playlist>,
    pub streak_days: u32,
    pub last_focus_date: Option<NaiveDate>,
    pub mystery_box_count: u32,
    pub active_power_ups: PowerUpState,
    pub premium_lofi_tracks: Vec<LofiTrackUnlock>,
    pub daily_focus_data: BTreeMap<NaiveDate, DailyFocus>,
    pub browser_notifications_enabled: bool,
    /// Minutes, always within 1..=180.
    pub current_pomodoro_duration_setting: u32,
    /// Last view the user was on. Advisory only.
    pub current_view: String,
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            points: 0,
            previous_points: 0,
            total_focus_time: 0,
            total_distractions: 0,
            total_videos_watched: 0,
            tasks: Vec::new(),
            playlists: Vec::new(),
            streak_days: 0,
            last_focus_date: None,
            mystery_box_count: 0,
            active_power_ups: PowerUpState::default(),
            premium_lofi_tracks: LofiTrackUnlock::catalog_defaults(),
            daily_focus_data: BTreeMap::new(),
            browser_notifications_enabled: false,
            current_pomodoro_duration_setting: DEFAULT_POMODORO_MINUTES,
            current_view: DEFAULT_VIEW.to_string(),
        }
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "crate::types::lenient::date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, deserialize_with = "crate::types::lenient::difficulty")]
    pub difficulty: Option<TaskDifficulty>,
    #[serde(default, deserialize_with = "crate::types::lenient::optional_count")]
    pub points_awarded: Option<u64>,
}

impl Task {
    /// Create an open task with no deadline or rating.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            deadline: None,
            difficulty: None,
            points_awarded: None,
        }
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_difficulty(mut self, difficulty: TaskDifficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Base reward for completing this task, before power-up multipliers.
    pub fn base_reward(&self) -> u64 {
        self.difficulty.map_or(TASK_POINTS_UNRATED, TaskDifficulty::points)
    }
}

/// Difficulty rating attached to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

impl_tag_conversions!(TaskDifficulty {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

impl TaskDifficulty {
    pub const fn points(self) -> u64 {
        match self {
            Self::Easy => TASK_POINTS_EASY,
            Self::Medium => TASK_POINTS_MEDIUM,
            Self::Hard => TASK_POINTS_HARD,
        }
    }
}

/// Saved group of video urls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Playlist {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self { name: name.into(), urls }
    }
}

/// State of both purchasable power-ups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PowerUpState {
    pub double_points: DoublePoints,
    pub streak_shield: StreakShield,
}

/// Doubles every point award while active and unexpired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublePoints {
    pub active: bool,
    /// Epoch milliseconds.
    pub expiry: Option<i64>,
}

impl DoublePoints {
    pub fn is_effective(&self, now_ms: i64) -> bool {
        self.active && self.expiry.map_or(true, |expiry| now_ms < expiry)
    }
}

/// Absorbs one missed day in the focus streak.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakShield {
    pub active: bool,
    pub used: bool,
    /// Epoch milliseconds.
    pub expiry: Option<i64>,
}

impl StreakShield {
    pub fn is_available(&self, now_ms: i64) -> bool {
        self.active && !self.used && self.expiry.map_or(true, |expiry| now_ms < expiry)
    }
}

/// Unlock flag for one premium lofi track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LofiTrackUnlock {
    pub id: String,
    #[serde(default)]
    pub unlocked: bool,
}

impl LofiTrackUnlock {
    /// One locked entry per track in the static catalog, in catalog order.
    pub fn catalog_defaults() -> Vec<Self> {
        PREMIUM_LOFI_CATALOG
            .iter()
            .map(|entry| Self { id: entry.id.to_string(), unlocked: false })
            .collect()
    }
}

/// Per-day focus history entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyFocus {
    /// Focused seconds on that day.
    pub focus_time: u64,
    pub distractions: u64,
}
