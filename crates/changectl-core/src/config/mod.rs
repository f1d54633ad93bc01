//! Configuration and profile management
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Profiles name a server, the account used against it and an optional default
//! organization. They live in a TOML file in the platform config directory.
//!
//! # Features
//!
//! - Multiple named profiles with a default
//! - Secure credential storage using OS keyring (optional)
//! - Environment variable expansion in config files
//! - Platform-specific config file locations

pub mod config;
pub mod credential;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, Profile, ResolvedProfile};
pub use credential::{CredentialStorage, CredentialStore};
pub use error::{ConfigError, Result};
