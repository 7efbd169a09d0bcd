//! Backend shims
//!
//! One implementation is picked from `BackendConfig::kind` at startup and
//! handed to the orchestrator as `Arc<dyn Backend>`.

pub mod firebase;
pub mod memory;
pub mod session;
pub mod supabase;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use focusmode_core::Backend;
use focusmode_domain::{BackendConfig, BackendKind, FocusError, Result};
use tracing::info;

pub use firebase::FirebaseBackend;
pub use memory::MemoryBackend;
pub use session::{AuthChannel, SessionFile, StoredSession};
pub use supabase::SupabaseBackend;

use crate::http::HttpClient;

/// Build the configured backend.
///
/// Fails with `FocusError::Config` when the section for the selected kind is
/// missing. No network I/O happens here; that waits for `initialize`.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    let session_file = config.session_file.as_ref().map(PathBuf::from);

    let backend: Arc<dyn Backend> = match config.kind {
        BackendKind::Firebase => {
            let firebase = config.firebase.clone().ok_or_else(|| missing_section(config.kind))?;
            Arc::new(
                FirebaseBackend::new(http_client(config)?, firebase)
                    .with_session_file(session_file),
            )
        }
        BackendKind::Supabase => {
            let supabase = config.supabase.clone().ok_or_else(|| missing_section(config.kind))?;
            Arc::new(
                SupabaseBackend::new(http_client(config)?, supabase)
                    .with_session_file(session_file),
            )
        }
        BackendKind::Memory => Arc::new(MemoryBackend::new().with_session_file(session_file)),
    };

    info!(backend = backend.name(), "Backend selected");
    Ok(backend)
}

fn http_client(config: &BackendConfig) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
        .user_agent(concat!("focusmode/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn missing_section(kind: BackendKind) -> FocusError {
    FocusError::Config(format!("backend '{kind}' selected but [backend.{kind}] is missing"))
}

#[cfg(test)]
mod tests {
    use focusmode_domain::SupabaseConfig;

    use super::*;

    #[test]
    fn memory_backend_needs_no_section() {
        let backend = create_backend(&BackendConfig::memory()).unwrap();
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn missing_section_is_config_error() {
        let config = BackendConfig { kind: BackendKind::Firebase, ..BackendConfig::memory() };
        assert!(matches!(create_backend(&config), Err(FocusError::Config(_))));
    }

    #[test]
    fn supabase_section_selects_supabase() {
        let config = BackendConfig {
            kind: BackendKind::Supabase,
            supabase: Some(SupabaseConfig {
                url: "https://demo.supabase.co".into(),
                anon_key: "anon".into(),
                table: "user_states".into(),
                redirect_url: None,
            }),
            ..BackendConfig::memory()
        };
        assert_eq!(create_backend(&config).unwrap().name(), "supabase");
    }
}
