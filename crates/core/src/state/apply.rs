//! State Applier: `RemoteUserState` -> `AppState`.
//!
//! Every scalar resolves as `remote ?? local`; the local value already holds
//! the hard default when nothing richer is known. Tasks, playlists and the
//! daily history are replaced wholesale when the remote carries them.
//! Premium track unlocks merge by id into the local catalog.

use focusmode_domain::constants::{MAX_POMODORO_MINUTES, MIN_POMODORO_MINUTES};
use focusmode_domain::{LofiTrackUnlock, RemoteUserState, UserState};

use super::AppState;

fn coalesce<T: Clone>(remote: Option<&T>, local: &mut T) {
    if let Some(value) = remote {
        *local = value.clone();
    }
}

impl AppState {
    /// Write a loaded record into session state. `None` is a no-op.
    pub fn apply(&mut self, remote: Option<&RemoteUserState>) {
        let Some(remote) = remote else {
            return;
        };

        coalesce(remote.points.as_ref(), &mut self.points);
        coalesce(remote.previous_points.as_ref(), &mut self.previous_points);
        coalesce(remote.total_focus_time.as_ref(), &mut self.total_focus_time);
        coalesce(remote.total_distractions.as_ref(), &mut self.total_distractions);
        coalesce(remote.total_videos_watched.as_ref(), &mut self.total_videos_watched);
        coalesce(remote.tasks.as_ref(), &mut self.tasks);
        coalesce(remote.playlists.as_ref(), &mut self.playlists);
        coalesce(remote.streak_days.as_ref(), &mut self.streak_days);
        if remote.last_focus_date.is_some() {
            self.last_focus_date = remote.last_focus_date;
        }
        coalesce(remote.mystery_box_count.as_ref(), &mut self.mystery_box_count);
        if let Some(power_ups) = &remote.active_power_ups {
            if let Some(double_points) = &power_ups.double_points {
                self.active_power_ups.double_points =
                    double_points.merge_into(&self.active_power_ups.double_points);
            }
            if let Some(streak_shield) = &power_ups.streak_shield {
                self.active_power_ups.streak_shield =
                    streak_shield.merge_into(&self.active_power_ups.streak_shield);
            }
        }
        if let Some(unlocks) = &remote.premium_lofi_tracks {
            self.merge_unlocks(unlocks);
        }
        coalesce(remote.daily_focus_data.as_ref(), &mut self.daily_focus_data);
        coalesce(
            remote.browser_notifications_enabled.as_ref(),
            &mut self.browser_notifications_enabled,
        );
        if let Some(minutes) = remote.current_pomodoro_duration_setting {
            self.current_pomodoro_duration_setting =
                minutes.clamp(MIN_POMODORO_MINUTES, MAX_POMODORO_MINUTES);
        }
        coalesce(remote.current_view.as_ref(), &mut self.current_view);
    }

    /// Copy unlock flags onto matching catalog entries. Ids the catalog does
    /// not know are ignored; catalog entries absent remotely keep their flag.
    fn merge_unlocks(&mut self, unlocks: &[LofiTrackUnlock]) {
        for unlock in unlocks {
            if let Some(track) =
                self.premium_lofi_tracks.iter_mut().find(|track| track.id == unlock.id)
            {
                track.unlocked = unlock.unlocked;
            }
        }
    }

    /// Build a session state from a complete record.
    pub fn from_record(record: UserState) -> Self {
        let mut state = Self::default();
        state.apply(Some(&RemoteUserState::from(record)));
        state
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use focusmode_domain::{
        DailyFocus, Playlist, RemoteDoublePoints, RemotePowerUpState, Task, TaskDifficulty,
    };
    use serde_json::json;

    use super::*;
    use crate::state::LofiTrack;

    fn three_track_state() -> AppState {
        let track = |id: &str| LofiTrack {
            id: id.to_string(),
            name: id.to_uppercase(),
            url: format!("https://tracks/{id}"),
            cost: 100,
            unlocked: false,
        };
        AppState {
            premium_lofi_tracks: vec![track("t1"), track("t2"), track("t3")],
            ..AppState::default()
        }
    }

    fn rich_state() -> AppState {
        let mut state = AppState::default();
        state.points = 420;
        state.previous_points = 400;
        state.total_focus_time = 7_200;
        state.total_distractions = 3;
        state.total_videos_watched = 5;
        state.tasks = vec![
            Task::new("draft essay").with_difficulty(TaskDifficulty::Hard),
            Task {
                completed: true,
                points_awarded: Some(10),
                ..Task::new("email prof")
                    .with_deadline(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            },
        ];
        state.playlists = vec![Playlist::new("deep work", vec!["https://v/1".into()])];
        state.streak_days = 6;
        state.last_focus_date = NaiveDate::from_ymd_opt(2024, 4, 30);
        state.mystery_box_count = 2;
        state.active_power_ups.double_points.active = true;
        state.active_power_ups.double_points.expiry = Some(1_714_500_000_000);
        state.active_power_ups.streak_shield.used = true;
        state.premium_lofi_tracks[0].unlocked = true;
        state.daily_focus_data.insert(
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            DailyFocus { focus_time: 3_600, distractions: 1 },
        );
        state.browser_notifications_enabled = true;
        state.current_pomodoro_duration_setting = 50;
        state.current_view = "stats".into();
        state
    }

    #[test]
    fn apply_none_is_noop() {
        let mut state = rich_state();
        let before = state.clone();
        state.apply(None);
        assert_eq!(state, before);
    }

    #[test]
    fn apply_is_idempotent() {
        let remote = RemoteUserState::from(rich_state().snapshot());
        let mut once = AppState::default();
        once.apply(Some(&remote));
        let mut twice = once.clone();
        twice.apply(Some(&remote));
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_remote_keeps_local_state() {
        let mut state = rich_state();
        let before = state.clone();
        state.apply(Some(&RemoteUserState::default()));
        assert_eq!(state, before);
    }

    #[test]
    fn partial_remote_only_overwrites_present_fields() {
        let mut state = rich_state();
        let remote = RemoteUserState {
            points: Some(5),
            tasks: Some(Vec::new()),
            active_power_ups: Some(RemotePowerUpState {
                double_points: Some(RemoteDoublePoints { active: Some(false), expiry: None }),
                streak_shield: None,
            }),
            ..RemoteUserState::default()
        };
        state.apply(Some(&remote));

        assert_eq!(state.points, 5);
        assert!(state.tasks.is_empty(), "tasks are replaced, not merged");
        assert_eq!(state.previous_points, 400);
        assert_eq!(state.streak_days, 6);
        assert!(state.browser_notifications_enabled);
        assert!(!state.active_power_ups.double_points.active);
        assert_eq!(state.active_power_ups.double_points.expiry, Some(1_714_500_000_000));
        assert!(state.active_power_ups.streak_shield.used);
    }

    #[test]
    fn lofi_unlocks_merge_by_id_and_ignore_unknown() {
        let mut state = three_track_state();
        let remote: RemoteUserState = serde_json::from_value(json!({
            "premiumLofiTracks": [
                {"id": "t2", "unlocked": true},
                {"id": "t9", "unlocked": true}
            ]
        }))
        .unwrap();
        state.apply(Some(&remote));

        let flags: Vec<_> =
            state.premium_lofi_tracks.iter().map(|t| (t.id.as_str(), t.unlocked)).collect();
        assert_eq!(flags, vec![("t1", false), ("t2", true), ("t3", false)]);
    }

    #[test]
    fn out_of_range_duration_is_clamped() {
        let mut state = AppState::default();
        state.apply(Some(&RemoteUserState {
            current_pomodoro_duration_setting: Some(0),
            ..RemoteUserState::default()
        }));
        assert_eq!(state.current_pomodoro_duration_setting, 1);
        state.apply(Some(&RemoteUserState {
            current_pomodoro_duration_setting: Some(999),
            ..RemoteUserState::default()
        }));
        assert_eq!(state.current_pomodoro_duration_setting, 180);
    }

    #[test]
    fn round_trip_through_json_is_exact() {
        let original = rich_state();
        let wire = serde_json::to_string(&original.snapshot()).unwrap();
        let remote: RemoteUserState = serde_json::from_str(&wire).unwrap();

        let mut restored = AppState::default();
        restored.apply(Some(&remote));
        assert_eq!(restored, original);
    }

    #[test]
    fn from_record_matches_snapshot() {
        let original = rich_state();
        assert_eq!(AppState::from_record(original.snapshot()), original);
    }
}
