//! Shared test helpers for `focusmode-core` integration tests.
//!
//! A scriptable in-memory backend and a UI port that records what it was
//! told, so orchestrator tests can assert on call order and routing.

pub mod backend;
pub mod ui;

pub use backend::ScriptedBackend;
pub use ui::RecordingUi;
