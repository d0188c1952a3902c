//! Logging setup.
//!
//! The engine logs through the `log` facade only; this module installs an
//! `env_logger` backend for binaries that want one.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
