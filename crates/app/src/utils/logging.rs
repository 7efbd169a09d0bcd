use focusmode_core::SyncOutcome;
use focusmode_domain::{ErrorSeverity, FocusError, LoggingConfig, Result};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.level`. Fails with `FocusError::Config` when
/// the level is not a valid filter directive or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|err| {
            FocusError::Config(format!("invalid log level '{}': {err}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|err| FocusError::Config(format!("failed to install tracing: {err}")))
}

/// Log the outcome of a console or lifecycle operation with structured
/// fields.
///
/// `operation` should be a stable identifier (`"save"`, `"sign_in"`).
pub fn log_outcome(operation: &str, outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Completed => info!(operation, "sync_operation_completed"),
        SyncOutcome::Deferred => info!(operation, "sync_operation_deferred"),
        SyncOutcome::Skipped(reason) => debug!(operation, ?reason, "sync_operation_skipped"),
        SyncOutcome::Redirect { url } => info!(operation, %url, "sync_operation_redirect"),
        SyncOutcome::Failed { error, severity: ErrorSeverity::Recoverable } => {
            warn!(operation, error = %error, label = error.label(), "sync_operation_failed")
        }
        SyncOutcome::Failed { error, severity: ErrorSeverity::Fatal } => {
            error!(operation, error = %error, label = error.label(), "sync_operation_failed")
        }
    }
}
