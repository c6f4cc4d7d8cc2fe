//! # DPA Common Library
//!
//! Shared code for the digital-preservation archive tooling including:
//! - Error types
//! - TOML bootstrap configuration and path resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
