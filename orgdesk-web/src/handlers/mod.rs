//! HTTP request handlers for the Orgdesk web server
//!
//! This module contains all the HTTP request handlers organized by functionality.

pub mod admin;
pub mod health;
pub mod members;
pub mod organizations;
pub mod pages;
pub mod types;

pub use admin::*;
pub use health::*;
pub use members::*;
pub use organizations::*;
pub use pages::*;

pub use types::*;
