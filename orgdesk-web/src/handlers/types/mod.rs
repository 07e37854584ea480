//! Type definitions for handlers
//!
//! Request and response bodies shared by the API handlers.

pub mod common;
pub mod organizations;

pub use common::*;
pub use organizations::*;
