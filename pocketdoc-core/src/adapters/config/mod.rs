//! Configuration types for database adapters.
//!
//! # Security
//! These configuration structs intentionally do NOT store passwords or credentials.
//! Credentials must be handled separately through the security module.

mod connection;

pub use connection::{ConnectionConfig, SslMode};
