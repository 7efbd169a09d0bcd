//! UI port that records routing and refresh calls

use std::sync::atomic::{AtomicUsize, Ordering};

use focusmode_core::{AppState, UiPort};
use focusmode_domain::View;
use parking_lot::Mutex;

#[derive(Default)]
pub struct RecordingUi {
    views: Mutex<Vec<View>>,
    refreshes: AtomicUsize,
    unavailable: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub fn views(&self) -> Vec<View> {
        self.views.lock().clone()
    }

    pub fn last_view(&self) -> Option<View> {
        self.views.lock().last().copied()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn unavailable(&self) -> Vec<String> {
        self.unavailable.lock().clone()
    }
}

impl UiPort for RecordingUi {
    fn show_view(&self, view: View) {
        self.views.lock().push(view);
    }

    fn refresh(&self, _state: &AppState) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn sync_unavailable(&self, reason: &str) {
        self.unavailable.lock().push(reason.to_string());
    }
}
