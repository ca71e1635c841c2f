//! Utilities.
pub mod conf;
pub mod crypto;
pub mod logger;
