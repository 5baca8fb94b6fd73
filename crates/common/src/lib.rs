//! Shelfwise Common Library
//!
//! Shared code for the Shelfwise services including:
//! - Database models and repository patterns
//! - Tag codec for the bracketed classification labels
//! - Query compiler and paged executor
//! - Report assemblers and overview statistics
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod query;
pub mod reports;
pub mod stats;
pub mod tags;

// Re-export commonly used types
pub use config::{AppConfig, CutoffProvider};
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Order status code meaning the order was cancelled by the vendor
pub const CANCELLED_STATUS: &str = "VC";
