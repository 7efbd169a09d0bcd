//! Configuration structures
//!
//! Loaded by `focusmode_infra::config` from the environment or from a
//! JSON/TOML file. The backend is selected here, once, at startup.

use serde::{Deserialize, Serialize};

use crate::errors::{FocusError, Result};
use crate::impl_tag_conversions;

/// Root application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Check that the section for the selected backend is present and
    /// usable.
    pub fn validate(&self) -> Result<()> {
        match self.backend.kind {
            BackendKind::Firebase => {
                let firebase = self.backend.firebase.as_ref().ok_or_else(|| {
                    FocusError::Config(
                        "backend 'firebase' selected but [backend.firebase] is missing".into(),
                    )
                })?;
                require_non_empty("backend.firebase.project_id", &firebase.project_id)?;
                require_non_empty("backend.firebase.api_key", &firebase.api_key)?;
            }
            BackendKind::Supabase => {
                let supabase = self.backend.supabase.as_ref().ok_or_else(|| {
                    FocusError::Config(
                        "backend 'supabase' selected but [backend.supabase] is missing".into(),
                    )
                })?;
                require_non_empty("backend.supabase.url", &supabase.url)?;
                require_non_empty("backend.supabase.anon_key", &supabase.anon_key)?;
            }
            BackendKind::Memory => {}
        }

        if self.sync.save_attempts == 0 {
            return Err(FocusError::Config("sync.save_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FocusError::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Which hosted backend this deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Firebase,
    Supabase,
    /// Process-local store; nothing leaves the machine.
    Memory,
}

impl_tag_conversions!(BackendKind {
    Firebase => "firebase",
    Supabase => "supabase",
    Memory => "memory",
});

/// Backend selection and connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    #[serde(default)]
    pub firebase: Option<FirebaseConfig>,
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
    /// Where the signed-in session is persisted between runs. No
    /// persistence when unset.
    #[serde(default)]
    pub session_file: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl BackendConfig {
    /// Config for the in-memory backend.
    pub fn memory() -> Self {
        Self {
            kind: BackendKind::Memory,
            firebase: None,
            supabase: None,
            session_file: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

const fn default_timeout_seconds() -> u64 {
    30
}

/// Firebase project settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: String,
    #[serde(default = "default_firebase_collection")]
    pub collection: String,
    /// Overrides for the Google API hosts (emulators, tests).
    #[serde(default)]
    pub auth_base_url: Option<String>,
    #[serde(default)]
    pub token_base_url: Option<String>,
    #[serde(default)]
    pub firestore_base_url: Option<String>,
    /// Continue URI registered for browser OAuth sign-in.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

fn default_firebase_collection() -> String {
    "users".to_string()
}

/// Supabase project settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_supabase_table")]
    pub table: String,
    /// Where the OAuth provider sends the browser back to.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

fn default_supabase_table() -> String {
    "user_states".to_string()
}

/// Sync orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_seconds: u64,
    /// Total attempts for a save (initial try + retries of recoverable
    /// failures).
    #[serde(default = "default_save_attempts")]
    pub save_attempts: u32,
    /// Push the local snapshot back after the sign-in load.
    #[serde(default = "default_true")]
    pub migrate_on_sign_in: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            autosave_interval_seconds: default_autosave_interval(),
            save_attempts: default_save_attempts(),
            migrate_on_sign_in: true,
        }
    }
}

const fn default_autosave_interval() -> u64 {
    60
}

const fn default_save_attempts() -> u32 {
    1
}

const fn default_true() -> bool {
    true
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
