//! # Focusmode App
//!
//! Composition root and headless console.
//!
//! This crate contains:
//! - Application context (dependency wiring, background task lifecycle)
//! - A tracing-backed view router implementing `UiPort`
//! - Console commands (line-oriented front end for the progress rules and
//!   sync operations)
//! - Logging initialisation
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture
//! - Owns process concerns: `.env`, signals, stdout

pub mod adapters;
pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::{Command, CommandError};
pub use context::AppContext;
