//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use focusmode_core::{Backend, SyncOrchestrator, SyncOutcome};
use focusmode_domain::{Config, Result};
use focusmode_infra::create_backend;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::TracingUi;
use crate::utils::log_outcome;

/// Application context - holds the backend, the orchestrator and the
/// background tasks started for them
pub struct AppContext {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub ui: Arc<TracingUi>,
    pub orchestrator: Arc<SyncOrchestrator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppContext {
    /// Validate `config` and build the configured backend.
    ///
    /// No network I/O happens until [`AppContext::start`].
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = create_backend(&config.backend)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Wire the context around an already constructed backend.
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        let ui = Arc::new(TracingUi::new());
        let orchestrator = Arc::new(
            SyncOrchestrator::new(Arc::clone(&backend), ui.clone())
                .with_settings(config.sync.clone()),
        );
        Self { config, backend, ui, orchestrator, tasks: Mutex::new(Vec::new()) }
    }

    /// Start the auth listener, bootstrap the backend and start autosave.
    ///
    /// The listener is subscribed before bootstrap so a restored session is
    /// observed. A failed bootstrap is reported, not returned: the session
    /// keeps running locally and `bootstrap` may be retried.
    pub async fn start(&self) -> SyncOutcome {
        let listener = self.orchestrator.spawn_auth_listener();
        self.tasks.lock().push(listener);

        let outcome = self.orchestrator.bootstrap().await;
        log_outcome("bootstrap", &outcome);

        let interval = Duration::from_secs(self.config.sync.autosave_interval_seconds.max(1));
        let autosave = self.orchestrator.spawn_autosave(interval);
        self.tasks.lock().push(autosave);

        info!(
            backend = self.backend.name(),
            autosave_seconds = interval.as_secs(),
            "Focusmode started"
        );
        outcome
    }

    /// Stop background tasks and make the final save.
    pub async fn shutdown(&self) -> SyncOutcome {
        let outcome = self.orchestrator.shutdown().await;
        log_outcome("shutdown", &outcome);

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Background task ended abnormally");
            }
        }
        outcome
    }
}
