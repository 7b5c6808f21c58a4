//! Library half of `pocketdoc-collect`.
//!
//! Configuration loading and the collection run live here so they can be
//! tested without spawning the binary.

pub mod collect;
pub mod config;

pub use collect::{cancel_on_ctrl_c, collect, collect_with, test_connection, write_output};
pub use config::{AppConfig, PASSWORD_ENV, Target};
