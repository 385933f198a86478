//! # Resale Common Library
//!
//! Shared code for the resale back-office services:
//! - Error and result types
//! - Root folder and TOML configuration resolution
//! - SQLite pool initialization and the settings table
//! - Event types and the broadcast event bus

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
