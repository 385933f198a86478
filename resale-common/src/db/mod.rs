//! Database initialization and shared tables

pub mod init;
pub mod settings;

pub use init::*;
pub use settings::*;
