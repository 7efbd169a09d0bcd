//! # Focusmode Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Backend shims: Firebase (Identity Toolkit + Firestore REST), Supabase
//!   (GoTrue + PostgREST) and a process-local store
//! - Session persistence and the auth-change channel
//! - HTTP client with retry and error mapping
//! - Configuration loading (environment, JSON, TOML)
//!
//! ## Architecture
//! - Implements traits defined in `focusmode-core`
//! - Depends on `focusmode-domain` and `focusmode-core`
//! - Contains all "impure" code (network, filesystem)

pub mod backends;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use backends::{create_backend, FirebaseBackend, MemoryBackend, SupabaseBackend};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
