//! orgdesk Core - shared infrastructure for the orgdesk workspace
//!
//! This crate holds the pieces every other crate leans on: the structured
//! error type, logging initialisation and the configuration model.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;
