//! Shared fixtures for backend integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;

use chrono::NaiveDate;
use focusmode_domain::{
    DailyFocus, FirebaseConfig, Playlist, SupabaseConfig, Task, TaskDifficulty, UserState,
};
use focusmode_infra::HttpClient;
use serde_json::{json, Value};
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Route backend logs to the test writer. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("focusmode_infra=debug")
            .with_test_writer()
            .try_init();
    });
}

pub fn http() -> HttpClient {
    HttpClient::new().expect("http client should build")
}

/// Firebase config with every Google host pointed at the mock server.
pub fn firebase_config(server: &MockServer) -> FirebaseConfig {
    FirebaseConfig {
        project_id: "focus-demo".into(),
        api_key: "test-key".into(),
        collection: "users".into(),
        auth_base_url: Some(server.uri()),
        token_base_url: Some(server.uri()),
        firestore_base_url: Some(server.uri()),
        redirect_url: Some("http://localhost:5173/callback".into()),
    }
}

pub fn firestore_path(user_id: &str) -> String {
    format!("/projects/focus-demo/databases/(default)/documents/users/{user_id}")
}

/// Identity Toolkit sign-in response for `uid`.
pub fn identity_response(uid: &str, id_token: &str) -> Value {
    json!({
        "localId": uid,
        "idToken": id_token,
        "refreshToken": format!("refresh-{uid}"),
        "expiresIn": "3600",
        "email": format!("{uid}@example.com"),
        "displayName": "Ada"
    })
}

pub fn supabase_config(server: &MockServer) -> SupabaseConfig {
    SupabaseConfig {
        url: server.uri(),
        anon_key: "anon-key".into(),
        table: "user_states".into(),
        redirect_url: None,
    }
}

/// GoTrue token grant response for `uid`.
pub fn gotrue_session(uid: &str, access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": format!("refresh-{uid}"),
        "user": gotrue_user(uid)
    })
}

pub fn gotrue_user(uid: &str) -> Value {
    json!({
        "id": uid,
        "email": format!("{uid}@example.com"),
        "user_metadata": {"full_name": "Ada Lovelace"},
        "app_metadata": {"provider": "email"}
    })
}

/// A record with every field away from its default.
pub fn populated_state() -> UserState {
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
    let mut state = UserState {
        points: 340,
        previous_points: 300,
        total_focus_time: 7_200,
        total_distractions: 3,
        total_videos_watched: 2,
        tasks: vec![
            Task::new("write report").with_difficulty(TaskDifficulty::Hard),
            Task::new("inbox zero").with_deadline(day),
        ],
        playlists: vec![Playlist::new("deep work", vec!["https://youtu.be/abc".into()])],
        streak_days: 4,
        last_focus_date: Some(day),
        mystery_box_count: 1,
        browser_notifications_enabled: true,
        current_pomodoro_duration_setting: 50,
        current_view: "dashboard".into(),
        ..UserState::default()
    };
    state.premium_lofi_tracks[0].unlocked = true;
    state.daily_focus_data =
        BTreeMap::from([(day, DailyFocus { focus_time: 3_000, distractions: 1 })]);
    state
}
