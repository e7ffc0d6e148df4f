//! Shared types, error model, and configuration for kyukou.
//!
//! This crate is the foundation depended on by all other kyukou crates.
//! It provides:
//! - [`KyukouError`] — the unified error type
//! - Domain types ([`Event`], [`TaskLogEntry`], [`Severity`], [`TaskOutcome`])
//! - Text normalization and content fingerprinting ([`normalize`], [`hash`])
//! - Configuration ([`AppConfig`], [`Source`], config loading)

pub mod config;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, Source, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_db_path,
};
pub use error::{KyukouError, Result};
pub use types::{
    Event, GRACE_WINDOW_HOURS, Severity, TaskLogEntry, TaskOutcome, TweetFlags, TweetKind,
    event_date_within_grace,
};
