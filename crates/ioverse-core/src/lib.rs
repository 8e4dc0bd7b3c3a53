pub mod account;
pub mod assistant;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;

// Re-export common error type
pub use error::{ErrorKind, IoverseError, Result};
