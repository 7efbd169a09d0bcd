//! Application constants
//!
//! Centralized location for all domain-level constants: defaults for the
//! persisted record, the reward tables and the static premium lofi catalog.

// UserState defaults
pub const DEFAULT_POMODORO_MINUTES: u32 = 25;
pub const MIN_POMODORO_MINUTES: u32 = 1;
pub const MAX_POMODORO_MINUTES: u32 = 180;
pub const DEFAULT_VIEW: &str = "dashboard";

// Rewards
pub const POINTS_PER_FOCUS_MINUTE: u64 = 1;
pub const DOUBLE_POINTS_MULTIPLIER: u64 = 2;
pub const TASK_POINTS_EASY: u64 = 10;
pub const TASK_POINTS_MEDIUM: u64 = 25;
pub const TASK_POINTS_HARD: u64 = 50;
pub const TASK_POINTS_UNRATED: u64 = TASK_POINTS_EASY;
/// A mystery box is granted every time the streak reaches a multiple of this.
pub const MYSTERY_BOX_STREAK_INTERVAL: u32 = 3;

// Power-ups
pub const DOUBLE_POINTS_COST: u64 = 100;
pub const DOUBLE_POINTS_DURATION_MS: i64 = 60 * 60 * 1000;
pub const STREAK_SHIELD_COST: u64 = 150;
pub const STREAK_SHIELD_DURATION_MS: i64 = 7 * 24 * 60 * 60 * 1000;

// Mystery box reward bounds (inclusive)
pub const MYSTERY_BOX_MIN_POINTS: u64 = 10;
pub const MYSTERY_BOX_MAX_POINTS: u64 = 100;

/// Static catalog entry for a premium lofi track. Only the unlock flag is
/// persisted; name, url and cost are configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LofiCatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub cost: u64,
}

pub const PREMIUM_LOFI_CATALOG: &[LofiCatalogEntry] = &[
    LofiCatalogEntry {
        id: "lofi-rainy-night",
        name: "Rainy Night Study",
        url: "https://www.youtube.com/watch?v=mPZkdNFkNps",
        cost: 200,
    },
    LofiCatalogEntry {
        id: "lofi-coffee-shop",
        name: "Coffee Shop Ambience",
        url: "https://www.youtube.com/watch?v=h2zkV-l_TbY",
        cost: 300,
    },
    LofiCatalogEntry {
        id: "lofi-synthwave",
        name: "Synthwave Focus",
        url: "https://www.youtube.com/watch?v=4xDzrJKXOOY",
        cost: 500,
    },
];

/// Look up a catalog entry by id.
pub fn lofi_catalog_entry(id: &str) -> Option<&'static LofiCatalogEntry> {
    PREMIUM_LOFI_CATALOG.iter().find(|entry| entry.id == id)
}
