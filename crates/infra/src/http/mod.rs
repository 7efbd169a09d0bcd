//! HTTP plumbing shared by the hosted backends

mod client;

pub use client::{HttpClient, HttpClientBuilder};
pub(crate) use client::error_detail;
