//! Physical document layouts and translation between them.
//!
//! The same `UserState` is stored under two naming conventions: Firestore
//! documents use identifier-style keys (`totalFocusTime`), Postgres rows use
//! underscore-separated column names (`total_focus_time`). Only top-level
//! keys differ; nested objects (tasks, power-ups, daily history entries)
//! keep identifier-style keys in both layouts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{FocusError, Result};
use crate::types::{RemoteUserState, UserState};

/// Top-level fields as `(identifier, underscore)` pairs.
pub const FIELD_NAMES: &[(&str, &str)] = &[
    ("points", "points"),
    ("previousPoints", "previous_points"),
    ("totalFocusTime", "total_focus_time"),
    ("totalDistractions", "total_distractions"),
    ("totalVideosWatched", "total_videos_watched"),
    ("tasks", "tasks"),
    ("playlists", "playlists"),
    ("streakDays", "streak_days"),
    ("lastFocusDate", "last_focus_date"),
    ("mysteryBoxCount", "mystery_box_count"),
    ("activePowerUps", "active_power_ups"),
    ("premiumLofiTracks", "premium_lofi_tracks"),
    ("dailyFocusData", "daily_focus_data"),
    ("browserNotificationsEnabled", "browser_notifications_enabled"),
    ("currentPomodoroDurationSetting", "current_pomodoro_duration_setting"),
    ("currentView", "current_view"),
];

/// Naming convention of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSchema {
    /// `camelCase` keys (Firestore).
    Identifier,
    /// `snake_case` keys (Postgres columns).
    Underscore,
}

impl DocumentSchema {
    /// Key used by this schema for an identifier-style field name.
    pub fn key<'a>(self, identifier: &'a str) -> &'a str {
        match self {
            Self::Identifier => identifier,
            Self::Underscore => FIELD_NAMES
                .iter()
                .find(|(camel, _)| *camel == identifier)
                .map_or(identifier, |(_, snake)| snake),
        }
    }

    /// All top-level keys in this schema, in table order.
    pub fn keys(self) -> impl Iterator<Item = &'static str> {
        FIELD_NAMES.iter().map(move |(camel, snake)| match self {
            Self::Identifier => *camel,
            Self::Underscore => *snake,
        })
    }
}

fn identifier_key(key: &str) -> Option<&'static str> {
    FIELD_NAMES
        .iter()
        .find(|(camel, snake)| *camel == key || *snake == key)
        .map(|(camel, _)| *camel)
}

/// Serialize a full record into the object layout of `schema`.
pub fn to_document(state: &UserState, schema: DocumentSchema) -> Result<Map<String, Value>> {
    let Value::Object(fields) = serde_json::to_value(state)? else {
        return Err(FocusError::Internal("user state did not serialize to an object".into()));
    };

    Ok(fields.into_iter().map(|(key, value)| (schema.key(&key).to_string(), value)).collect())
}

/// Decode a stored document into a partial record.
///
/// Keys from either schema are accepted so rows written during a migration
/// still load; `schema` wins when a document carries both spellings of the
/// same field. Unknown keys (`user_id`, `updated_at`, ...) are ignored.
pub fn from_document(document: Value, schema: DocumentSchema) -> Result<RemoteUserState> {
    let Value::Object(fields) = document else {
        return Err(FocusError::Serialization("stored document is not an object".into()));
    };

    let mut normalized = Map::with_capacity(fields.len());
    let mut preferred = Vec::new();
    for (key, value) in fields {
        let Some(identifier) = identifier_key(&key) else {
            continue;
        };
        if schema.key(identifier) == key {
            preferred.push((identifier, value));
        } else {
            normalized.insert(identifier.to_string(), value);
        }
    }
    for (identifier, value) in preferred {
        normalized.insert(identifier.to_string(), value);
    }

    Ok(serde_json::from_value(Value::Object(normalized))?)
}
