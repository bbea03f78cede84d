//! Network access to the remote contract distribution.
//!
//! This module provides:
//! - An HTTP client with the library's timeouts
//! - Fixed-delay retry for asset fetches
//! - The HTTP-backed `ManifestProvider`

mod client;
mod retry;
mod source;

pub use client::{extract_domain, HttpClient};
pub use retry::{retry_async, RetryConfig, RetryStats};
pub use source::HttpManifestProvider;
