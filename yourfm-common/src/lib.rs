//! # YourFM Common Library
//!
//! Shared code for the YourFM station services:
//! - Error type shared by every crate
//! - Bootstrap configuration (TOML + environment + defaults)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
