//! # Sapphire Common Library
//!
//! Shared code for the Sapphire Platform backend:
//! - Database schema initialization and migrations
//! - Database models
//! - Configuration loading and root folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
