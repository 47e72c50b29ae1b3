//! Shared types, error model, and configuration for docfetch.
//!
//! This crate is the foundation depended on by all other docfetch crates.
//! It provides:
//! - [`DocFetchError`]: the unified error type
//! - Domain types ([`ProcessedDocument`], [`BatchResult`], [`Partition`], [`UrlInput`])
//! - Configuration ([`AppConfig`], [`BatchOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchOptions, HttpConfig, MarkdownConfig, ProcessorConfig, RateLimitConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{DocFetchError, Result};
pub use types::{BatchResult, ConvertedPage, Partition, ProcessedDocument, UrlInput};
