//! # quip-config
//!
//! Configuration system for the quip bot. Reads `quip.toml`: a `[connect]`
//! section describing the server session and a free-form `[scripts]` section
//! with typed per-key accessors, consumed uniformly by the script registry.

pub mod loader;
pub mod schema;

pub use loader::{load, reload, resolve_path};
pub use schema::{ConnectConfig, LoggingConfig, QuipConfig, ScriptsConfig};
