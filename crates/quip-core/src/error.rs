use thiserror::Error;

/// Unified error type for the entire quip bot.
#[derive(Error, Debug)]
pub enum QuipError {
    // ── Script errors ──────────────────────────────────────────
    #[error("script error: {script}: {reason}")]
    Script { script: String, reason: String },

    #[error("script not found: {0}")]
    ScriptNotFound(String),

    // ── Transport errors ───────────────────────────────────────
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not connected")]
    NotConnected,

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config key `{key}` has the wrong type: expected {expected}")]
    ConfigType { key: String, expected: &'static str },

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QuipError>;
