//! Batch orchestration and the tool-facing adapter for docfetch.
//!
//! This crate ties validation, the rate-limited fetcher, and a bounded worker
//! pool together into [`BatchProcessor::process`], and exposes the
//! never-failing [`BatchProcessor::process_multiple_urls`] entry point.

pub mod pool;
pub mod processor;
pub mod tool;

pub use pool::{TaskOutcome, WorkerPool};
pub use processor::{BatchProcessor, ProgressReporter, SilentProgress};
pub use tool::{Summary, TOOL_NAME, ToolRequest, ToolResponse, tool_definition};
