//! # Focusmode Domain
//!
//! Business domain types and models for focusmode.
//!
//! This crate contains:
//! - The persisted `UserState` record and its parts (tasks, playlists,
//!   power-ups, premium track unlocks, daily focus history)
//! - The partial `RemoteUserState` used on the load side
//! - Document schema translation between the two physical backends
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants (static lofi catalog, reward tables)
//!
//! ## Architecture
//! - No dependencies on other focusmode crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod schema;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use schema::{from_document, to_document, DocumentSchema};
pub use types::*;
