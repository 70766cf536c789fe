//! Shared utilities, configuration, and error handling for Carebase
//!
//! This crate provides common functionality used across the Carebase application:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Repository error bridging
//! - Pagination parameters for list endpoints
//! - Tracing initialization

pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod telemetry;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use pagination::Pagination;
pub use telemetry::init_tracing;
