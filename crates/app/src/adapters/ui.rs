//! View router that records the visible screen and reports through tracing.

use focusmode_core::{AppState, UiPort};
use focusmode_domain::View;
use parking_lot::Mutex;
use tracing::{info, warn};

/// `UiPort` for a headless process
#[derive(Debug, Default)]
pub struct TracingUi {
    view: Mutex<Option<View>>,
    unavailable: Mutex<Option<String>>,
}

impl TracingUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen most recently routed to.
    pub fn current_view(&self) -> Option<View> {
        *self.view.lock()
    }

    /// Why sync is unavailable, if the last bootstrap failed.
    pub fn unavailable_reason(&self) -> Option<String> {
        self.unavailable.lock().clone()
    }
}

impl UiPort for TracingUi {
    fn show_view(&self, view: View) {
        let previous = self.view.lock().replace(view);
        if previous != Some(view) {
            info!(%view, "View changed");
        }
    }

    fn refresh(&self, state: &AppState) {
        self.unavailable.lock().take();
        info!(
            points = state.points,
            streak_days = state.streak_days,
            tasks = state.tasks.len(),
            "Progress loaded"
        );
    }

    fn sync_unavailable(&self, reason: &str) {
        warn!(%reason, "Sync unavailable; progress stays local");
        *self.unavailable.lock() = Some(reason.to_string());
    }
}
