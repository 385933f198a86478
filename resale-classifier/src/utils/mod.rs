//! Utility modules

pub mod db_retry;
pub mod external_retry;

pub use db_retry::retry_on_lock;
pub use external_retry::{retry_transient, RetryExhausted, RetryPolicy};
