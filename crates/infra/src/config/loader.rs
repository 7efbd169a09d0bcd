//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `FOCUSMODE_BACKEND` is unset or the selected backend's variables
//!    are incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `FOCUSMODE_BACKEND`: `firebase`, `supabase` or `memory` (required)
//! - `FOCUSMODE_FIREBASE_PROJECT_ID`, `FOCUSMODE_FIREBASE_API_KEY`
//!   (required for firebase)
//! - `FOCUSMODE_FIREBASE_COLLECTION`, `FOCUSMODE_FIREBASE_AUTH_URL`,
//!   `FOCUSMODE_FIREBASE_TOKEN_URL`, `FOCUSMODE_FIREBASE_FIRESTORE_URL`,
//!   `FOCUSMODE_FIREBASE_REDIRECT_URL`
//! - `FOCUSMODE_SUPABASE_URL`, `FOCUSMODE_SUPABASE_ANON_KEY` (required for
//!   supabase)
//! - `FOCUSMODE_SUPABASE_TABLE`, `FOCUSMODE_SUPABASE_REDIRECT_URL`
//! - `FOCUSMODE_SESSION_FILE`: where the signed-in session is persisted
//! - `FOCUSMODE_HTTP_TIMEOUT`: request timeout in seconds
//! - `FOCUSMODE_AUTOSAVE_INTERVAL`: autosave period in seconds
//! - `FOCUSMODE_SAVE_ATTEMPTS`: attempts per save
//! - `FOCUSMODE_MIGRATE_ON_SIGN_IN`: push local state after sign-in
//!   (true/false)
//! - `FOCUSMODE_LOG_LEVEL`, `FOCUSMODE_LOG_JSON`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./focusmode.json` or `./focusmode.toml` (current working directory)
//! 3. `../config.{json,toml}` and `../../config.{json,toml}`
//! 4. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use focusmode_domain::{
    BackendConfig, BackendKind, Config, FirebaseConfig, FocusError, LoggingConfig, Result,
    SupabaseConfig, SyncSettings,
};

const FILE_STEMS: [&str; 2] = ["config", "focusmode"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `FocusError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!(
                backend = %config.backend.kind,
                "Configuration loaded from environment variables"
            );
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `FocusError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let kind: BackendKind = env_parse("FOCUSMODE_BACKEND")?;

    let firebase = match kind {
        BackendKind::Firebase => Some(FirebaseConfig {
            project_id: env_var("FOCUSMODE_FIREBASE_PROJECT_ID")?,
            api_key: env_var("FOCUSMODE_FIREBASE_API_KEY")?,
            collection: env_opt("FOCUSMODE_FIREBASE_COLLECTION").unwrap_or_else(|| "users".into()),
            auth_base_url: env_opt("FOCUSMODE_FIREBASE_AUTH_URL"),
            token_base_url: env_opt("FOCUSMODE_FIREBASE_TOKEN_URL"),
            firestore_base_url: env_opt("FOCUSMODE_FIREBASE_FIRESTORE_URL"),
            redirect_url: env_opt("FOCUSMODE_FIREBASE_REDIRECT_URL"),
        }),
        _ => None,
    };

    let supabase = match kind {
        BackendKind::Supabase => Some(SupabaseConfig {
            url: env_var("FOCUSMODE_SUPABASE_URL")?,
            anon_key: env_var("FOCUSMODE_SUPABASE_ANON_KEY")?,
            table: env_opt("FOCUSMODE_SUPABASE_TABLE").unwrap_or_else(|| "user_states".into()),
            redirect_url: env_opt("FOCUSMODE_SUPABASE_REDIRECT_URL"),
        }),
        _ => None,
    };

    let mut backend = BackendConfig {
        kind,
        firebase,
        supabase,
        session_file: env_opt("FOCUSMODE_SESSION_FILE"),
        ..BackendConfig::memory()
    };
    if let Some(timeout) = env_parse_opt("FOCUSMODE_HTTP_TIMEOUT")? {
        backend.timeout_seconds = timeout;
    }

    let mut sync = SyncSettings::default();
    if let Some(interval) = env_parse_opt("FOCUSMODE_AUTOSAVE_INTERVAL")? {
        sync.autosave_interval_seconds = interval;
    }
    if let Some(attempts) = env_parse_opt("FOCUSMODE_SAVE_ATTEMPTS")? {
        sync.save_attempts = attempts;
    }
    sync.migrate_on_sign_in = env_bool("FOCUSMODE_MIGRATE_ON_SIGN_IN", sync.migrate_on_sign_in);

    let mut logging = LoggingConfig::default();
    if let Some(level) = env_opt("FOCUSMODE_LOG_LEVEL") {
        logging.level = level;
    }
    logging.json = env_bool("FOCUSMODE_LOG_JSON", false);

    Ok(Config { backend, sync, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `FocusError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FocusError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FocusError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FocusError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FocusError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FocusError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FocusError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots.iter().flat_map(|root| candidates(root)).find(|path| path.exists())
}

fn candidates(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for stem in FILE_STEMS {
        for extension in ["json", "toml"] {
            paths.push(root.join(format!("{stem}.{extension}")));
        }
    }
    for parent in ["..", "../.."] {
        for extension in ["json", "toml"] {
            paths.push(root.join(parent).join(format!("config.{extension}")));
        }
    }
    paths
}

/// Get required environment variable
///
/// # Errors
/// Returns `FocusError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        FocusError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_var(key)?;
    raw.parse::<T>().map_err(|e| FocusError::Config(format!("Invalid {}: {}", key, e)))
}

fn env_parse_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(_) => env_parse(key).map(Some),
        None => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: &[&str] = &[
        "FOCUSMODE_BACKEND",
        "FOCUSMODE_FIREBASE_PROJECT_ID",
        "FOCUSMODE_FIREBASE_API_KEY",
        "FOCUSMODE_FIREBASE_COLLECTION",
        "FOCUSMODE_SUPABASE_URL",
        "FOCUSMODE_SUPABASE_ANON_KEY",
        "FOCUSMODE_SUPABASE_TABLE",
        "FOCUSMODE_SESSION_FILE",
        "FOCUSMODE_HTTP_TIMEOUT",
        "FOCUSMODE_AUTOSAVE_INTERVAL",
        "FOCUSMODE_SAVE_ATTEMPTS",
        "FOCUSMODE_MIGRATE_ON_SIGN_IN",
        "FOCUSMODE_LOG_LEVEL",
        "FOCUSMODE_LOG_JSON",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for value in ["1", "true", "yes", "on", "TRUE"] {
            std::env::set_var("FOCUSMODE_TEST_BOOL", value);
            assert!(env_bool("FOCUSMODE_TEST_BOOL", false), "{value} should be true");
        }
        for value in ["0", "false", "no", "off"] {
            std::env::set_var("FOCUSMODE_TEST_BOOL", value);
            assert!(!env_bool("FOCUSMODE_TEST_BOOL", true), "{value} should be false");
        }

        std::env::remove_var("FOCUSMODE_TEST_BOOL");
        assert!(env_bool("FOCUSMODE_TEST_BOOL", true));
        assert!(!env_bool("FOCUSMODE_TEST_BOOL", false));
    }

    #[test]
    fn test_load_from_env_supabase() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("FOCUSMODE_BACKEND", "supabase");
        std::env::set_var("FOCUSMODE_SUPABASE_URL", "https://demo.supabase.co");
        std::env::set_var("FOCUSMODE_SUPABASE_ANON_KEY", "anon");
        std::env::set_var("FOCUSMODE_SESSION_FILE", "/tmp/focusmode-session.json");
        std::env::set_var("FOCUSMODE_AUTOSAVE_INTERVAL", "15");
        std::env::set_var("FOCUSMODE_SAVE_ATTEMPTS", "3");
        std::env::set_var("FOCUSMODE_MIGRATE_ON_SIGN_IN", "false");
        std::env::set_var("FOCUSMODE_LOG_JSON", "true");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.backend.kind, BackendKind::Supabase);
        let supabase = config.backend.supabase.unwrap();
        assert_eq!(supabase.url, "https://demo.supabase.co");
        assert_eq!(supabase.table, "user_states");
        assert!(config.backend.firebase.is_none());
        assert_eq!(config.backend.session_file.as_deref(), Some("/tmp/focusmode-session.json"));
        assert_eq!(config.sync.autosave_interval_seconds, 15);
        assert_eq!(config.sync.save_attempts, 3);
        assert!(!config.sync.migrate_on_sign_in);
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_firebase_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("FOCUSMODE_BACKEND", "Firebase");
        std::env::set_var("FOCUSMODE_FIREBASE_PROJECT_ID", "focus-app");
        std::env::set_var("FOCUSMODE_FIREBASE_API_KEY", "key");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        let firebase = config.backend.firebase.as_ref().unwrap();
        assert_eq!(firebase.collection, "users");
        assert_eq!(config.backend.timeout_seconds, 30);
        assert_eq!(config.sync, SyncSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        assert!(matches!(load_from_env(), Err(FocusError::Config(_))), "backend is required");

        std::env::set_var("FOCUSMODE_BACKEND", "firebase");
        std::env::set_var("FOCUSMODE_FIREBASE_PROJECT_ID", "focus-app");
        let result = load_from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("FOCUSMODE_FIREBASE_API_KEY"));
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("FOCUSMODE_BACKEND", "dropbox");
        assert!(matches!(load_from_env(), Err(FocusError::Config(_))));

        std::env::set_var("FOCUSMODE_BACKEND", "memory");
        std::env::set_var("FOCUSMODE_SAVE_ATTEMPTS", "lots");
        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(FocusError::Config(_))));
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "backend": {
                    "kind": "firebase",
                    "firebase": {"project_id": "focus-app", "api_key": "key"},
                    "session_file": "session.json"
                },
                "sync": {"autosave_interval_seconds": 20}
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Firebase);
        assert_eq!(config.backend.firebase.unwrap().project_id, "focus-app");
        assert_eq!(config.sync.autosave_interval_seconds, 20);
        assert_eq!(config.sync.save_attempts, 1);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
[backend]
kind = "supabase"

[backend.supabase]
url = "https://demo.supabase.co"
anon_key = "anon"
table = "focus_states"

[logging]
level = "debug"
json = true
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(config.backend.supabase.unwrap().table, "focus_states");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(FocusError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");
        assert!(load_from_file(Some(path.clone())).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_candidates_cover_both_stems() {
        let names: Vec<PathBuf> = candidates(Path::new("/srv/app"));
        assert_eq!(names[0], PathBuf::from("/srv/app/config.json"));
        assert!(names.contains(&PathBuf::from("/srv/app/focusmode.toml")));
        assert!(names.contains(&PathBuf::from("/srv/app/../../config.toml")));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
