//! URL validation, rate limiting, and single-URL fetch-and-convert.
//!
//! This crate provides:
//! - [`validator`]: syntactic URL checks and valid/invalid partitioning
//! - [`rate_limiter`]: the process-wide sliding-window quota
//! - [`converter`]: the [`Converter`] seam and its HTTP implementation
//! - [`fetcher`]: [`Fetcher`], which never fails and yields one document per URL

pub mod converter;
pub mod fetcher;
pub mod rate_limiter;
pub mod validator;

pub use converter::{Converter, HttpConverter};
pub use fetcher::Fetcher;
pub use rate_limiter::SlidingWindowRateLimiter;
pub use validator::{is_valid_url, partition_urls};
