//! Crag Core Library
//!
//! This crate provides the foundational utilities shared by every crate in
//! the corrective RAG workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure (`logging::init_logging`, called once by the
//!   embedding application)
//! - Configuration management
//! - Bounded retry for transient upstream failures

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use retry::{retry_transient, RetryPolicy};
