//! Gamification rules over `AppState`.
//!
//! Every operation here mutates in-memory state only. Persisting the result
//! is the orchestrator's job (`SyncOrchestrator::save`).

use chrono::{Duration, NaiveDate};
use focusmode_domain::constants::{
    DOUBLE_POINTS_COST, DOUBLE_POINTS_DURATION_MS, DOUBLE_POINTS_MULTIPLIER,
    MAX_POMODORO_MINUTES, MIN_POMODORO_MINUTES, MYSTERY_BOX_MAX_POINTS, MYSTERY_BOX_MIN_POINTS,
    MYSTERY_BOX_STREAK_INTERVAL, POINTS_PER_FOCUS_MINUTE, STREAK_SHIELD_COST,
    STREAK_SHIELD_DURATION_MS,
};
use focusmode_domain::{Playlist, Task};
use rand::Rng;
use thiserror::Error;

use crate::state::AppState;

/// Rejected progress operation. State is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("insufficient points: need {needed}, have {available}")]
    InsufficientPoints { needed: u64, available: u64 },

    #[error("unknown track: {0}")]
    UnknownTrack(String),

    #[error("track already unlocked: {0}")]
    AlreadyUnlocked(String),

    #[error("no mystery boxes to open")]
    NoMysteryBoxes,

    #[error("no task at index {0}")]
    TaskOutOfRange(usize),

    #[error("task already completed: {0}")]
    TaskAlreadyCompleted(String),

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("no playlist at index {0}")]
    PlaylistOutOfRange(usize),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("power-up already active: {0}")]
    PowerUpActive(&'static str),
}

/// What a completed focus block earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusReward {
    pub points: u64,
    pub streak_days: u32,
    pub mystery_boxes: u32,
    /// A streak shield absorbed a missed day.
    pub shield_consumed: bool,
}

/// Contents of an opened mystery box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MysteryReward {
    Points(u64),
    DoublePoints,
    StreakShield,
}

impl AppState {
    fn set_points(&mut self, points: u64) {
        self.previous_points = self.points;
        self.points = points;
    }

    fn award(&mut self, base: u64, now_ms: i64) -> u64 {
        let earned = if self.active_power_ups.double_points.is_effective(now_ms) {
            base.saturating_mul(DOUBLE_POINTS_MULTIPLIER)
        } else {
            base
        };
        if earned > 0 {
            self.set_points(self.points.saturating_add(earned));
        }
        earned
    }

    fn spend(&mut self, cost: u64) -> Result<(), ProgressError> {
        if self.points < cost {
            return Err(ProgressError::InsufficientPoints { needed: cost, available: self.points });
        }
        self.set_points(self.points - cost);
        Ok(())
    }

    /// Record a finished focus block of `seconds` on `today`.
    pub fn record_focus(
        &mut self,
        seconds: u64,
        today: NaiveDate,
        now_ms: i64,
    ) -> Result<FocusReward, ProgressError> {
        if seconds == 0 {
            return Err(ProgressError::InvalidDuration("focus block of zero seconds".into()));
        }

        self.total_focus_time = self.total_focus_time.saturating_add(seconds);
        let day = self.daily_focus_data.entry(today).or_default();
        day.focus_time = day.focus_time.saturating_add(seconds);

        let points = self.award((seconds / 60) * POINTS_PER_FOCUS_MINUTE, now_ms);
        let (streak_grew, shield_consumed) = self.advance_streak(today, now_ms);

        let mut mystery_boxes = 0;
        if streak_grew && self.streak_days % MYSTERY_BOX_STREAK_INTERVAL == 0 {
            self.mystery_box_count = self.mystery_box_count.saturating_add(1);
            mystery_boxes = 1;
        }

        Ok(FocusReward { points, streak_days: self.streak_days, mystery_boxes, shield_consumed })
    }

    /// Returns (streak grew, shield consumed).
    fn advance_streak(&mut self, today: NaiveDate, now_ms: i64) -> (bool, bool) {
        let previous = self.last_focus_date;
        if previous.map_or(false, |last| last >= today) {
            if self.streak_days == 0 {
                self.streak_days = 1;
                return (true, false);
            }
            return (false, false);
        }
        self.last_focus_date = Some(today);

        let Some(last) = previous else {
            self.streak_days = 1;
            return (true, false);
        };

        if last + Duration::days(1) == today {
            self.streak_days = self.streak_days.saturating_add(1);
            return (true, false);
        }

        if self.active_power_ups.streak_shield.is_available(now_ms) {
            self.active_power_ups.streak_shield.used = true;
            self.streak_days = self.streak_days.saturating_add(1);
            return (true, true);
        }

        self.streak_days = 1;
        (true, false)
    }

    pub fn record_distraction(&mut self, today: NaiveDate) {
        self.total_distractions = self.total_distractions.saturating_add(1);
        let day = self.daily_focus_data.entry(today).or_default();
        day.distractions = day.distractions.saturating_add(1);
    }

    pub fn record_video_watched(&mut self) {
        self.total_videos_watched = self.total_videos_watched.saturating_add(1);
    }

    /// Append a task; returns its index.
    pub fn add_task(&mut self, task: Task) -> Result<usize, ProgressError> {
        if task.title.trim().is_empty() {
            return Err(ProgressError::EmptyTitle);
        }
        self.tasks.push(task);
        Ok(self.tasks.len() - 1)
    }

    /// Mark a task done and award its difficulty reward. Returns the points awarded.
    pub fn complete_task(&mut self, index: usize, now_ms: i64) -> Result<u64, ProgressError> {
        let task = self.tasks.get(index).ok_or(ProgressError::TaskOutOfRange(index))?;
        if task.completed {
            return Err(ProgressError::TaskAlreadyCompleted(task.title.clone()));
        }
        let base = task.base_reward();
        let awarded = self.award(base, now_ms);
        if let Some(task) = self.tasks.get_mut(index) {
            task.completed = true;
            task.points_awarded = Some(awarded);
        }
        Ok(awarded)
    }

    pub fn remove_task(&mut self, index: usize) -> Result<Task, ProgressError> {
        if index >= self.tasks.len() {
            return Err(ProgressError::TaskOutOfRange(index));
        }
        Ok(self.tasks.remove(index))
    }

    pub fn add_playlist(&mut self, playlist: Playlist) -> Result<usize, ProgressError> {
        if playlist.name.trim().is_empty() {
            return Err(ProgressError::EmptyTitle);
        }
        self.playlists.push(playlist);
        Ok(self.playlists.len() - 1)
    }

    pub fn remove_playlist(&mut self, index: usize) -> Result<Playlist, ProgressError> {
        if index >= self.playlists.len() {
            return Err(ProgressError::PlaylistOutOfRange(index));
        }
        Ok(self.playlists.remove(index))
    }

    /// Buy one hour of double points.
    pub fn activate_double_points(&mut self, now_ms: i64) -> Result<(), ProgressError> {
        if self.active_power_ups.double_points.is_effective(now_ms) {
            return Err(ProgressError::PowerUpActive("double points"));
        }
        self.spend(DOUBLE_POINTS_COST)?;
        self.grant_double_points(now_ms);
        Ok(())
    }

    /// Buy a streak shield valid for seven days.
    pub fn activate_streak_shield(&mut self, now_ms: i64) -> Result<(), ProgressError> {
        if self.active_power_ups.streak_shield.is_available(now_ms) {
            return Err(ProgressError::PowerUpActive("streak shield"));
        }
        self.spend(STREAK_SHIELD_COST)?;
        self.grant_streak_shield(now_ms);
        Ok(())
    }

    fn grant_double_points(&mut self, now_ms: i64) {
        let double_points = &mut self.active_power_ups.double_points;
        double_points.active = true;
        double_points.expiry = Some(now_ms + DOUBLE_POINTS_DURATION_MS);
    }

    fn grant_streak_shield(&mut self, now_ms: i64) {
        let shield = &mut self.active_power_ups.streak_shield;
        shield.active = true;
        shield.used = false;
        shield.expiry = Some(now_ms + STREAK_SHIELD_DURATION_MS);
    }

    /// Deactivate power-ups whose expiry has passed. Returns whether anything changed.
    pub fn expire_power_ups(&mut self, now_ms: i64) -> bool {
        let mut changed = false;
        let double_points = &mut self.active_power_ups.double_points;
        if double_points.active && double_points.expiry.map_or(false, |expiry| now_ms >= expiry) {
            double_points.active = false;
            changed = true;
        }
        let shield = &mut self.active_power_ups.streak_shield;
        if shield.active && shield.expiry.map_or(false, |expiry| now_ms >= expiry) {
            shield.active = false;
            changed = true;
        }
        changed
    }

    /// Unlock a premium track for its catalog cost.
    pub fn unlock_track(&mut self, id: &str) -> Result<u64, ProgressError> {
        let track = self.track(id).ok_or_else(|| ProgressError::UnknownTrack(id.to_string()))?;
        if track.unlocked {
            return Err(ProgressError::AlreadyUnlocked(id.to_string()));
        }
        let cost = track.cost;
        self.spend(cost)?;
        if let Some(track) = self.premium_lofi_tracks.iter_mut().find(|track| track.id == id) {
            track.unlocked = true;
        }
        Ok(cost)
    }

    /// Consume one mystery box.
    ///
    /// 70% points in `MYSTERY_BOX_MIN_POINTS..=MYSTERY_BOX_MAX_POINTS`,
    /// 20% an hour of double points, 10% a streak shield.
    pub fn open_mystery_box<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now_ms: i64,
    ) -> Result<MysteryReward, ProgressError> {
        if self.mystery_box_count == 0 {
            return Err(ProgressError::NoMysteryBoxes);
        }
        self.mystery_box_count -= 1;

        let roll: u32 = rng.gen_range(0..100);
        let reward = if roll < 70 {
            let points = rng.gen_range(MYSTERY_BOX_MIN_POINTS..=MYSTERY_BOX_MAX_POINTS);
            self.set_points(self.points.saturating_add(points));
            MysteryReward::Points(points)
        } else if roll < 90 {
            self.grant_double_points(now_ms);
            MysteryReward::DoublePoints
        } else {
            self.grant_streak_shield(now_ms);
            MysteryReward::StreakShield
        };
        Ok(reward)
    }

    pub fn set_pomodoro_duration(&mut self, minutes: u32) -> Result<(), ProgressError> {
        if !(MIN_POMODORO_MINUTES..=MAX_POMODORO_MINUTES).contains(&minutes) {
            return Err(ProgressError::InvalidDuration(format!(
                "{minutes} minutes is outside {MIN_POMODORO_MINUTES}..={MAX_POMODORO_MINUTES}"
            )));
        }
        self.current_pomodoro_duration_setting = minutes;
        Ok(())
    }

    pub fn set_notifications(&mut self, enabled: bool) {
        self.browser_notifications_enabled = enabled;
    }
}
