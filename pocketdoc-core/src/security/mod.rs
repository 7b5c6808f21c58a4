//! Credential handling and connection string parsing.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Connection strings are parsed so credentials never reach [`crate::adapters::ConnectionConfig`]
//! - Passwords are redacted from `Debug` output, logs and error messages

mod connection;
mod credentials;

pub use connection::parse_connection_string;
pub use credentials::Credentials;
