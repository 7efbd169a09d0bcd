//! # Focusmode Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The in-memory session state (`AppState`, `Session`)
//! - Snapshot Builder and State Applier between `AppState` and the
//!   persisted `UserState`
//! - Progress rules (points, streaks, power-ups, tasks, unlocks)
//! - Port/adapter interfaces for backends and the UI (traits)
//! - The ready-queue and the Sync Orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `focusmode-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod progress;
pub mod state;
pub mod sync;
pub mod user;

// Re-export specific items to avoid ambiguity
pub use progress::{FocusReward, MysteryReward, ProgressError};
pub use state::{AppState, LofiTrack, Session, SharedSession};
pub use sync::ports::{Backend, StateStore, UiPort};
pub use sync::ready_queue::{ReadyQueue, ReadyState, Submission};
pub use sync::{SkipReason, SyncAvailability, SyncOp, SyncOrchestrator, SyncOutcome};
pub use user::ports::AuthProvider;
