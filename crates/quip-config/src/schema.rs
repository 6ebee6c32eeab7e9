use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use quip_core::{ParamDefault, ParamValue, QuipError, Result};

/// Root configuration — maps to `quip.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuipConfig {
    pub connect: ConnectConfig,
    pub scripts: ScriptsConfig,
    pub logging: LoggingConfig,
}

impl QuipConfig {
    /// Startup validation. The server and at least one channel are required;
    /// everything else has a workable default.
    pub fn validate(&self) -> Result<()> {
        if self.connect.server.is_empty() {
            return Err(QuipError::Config("connect.server must be set".into()));
        }
        if self.connect.channels.is_empty() {
            return Err(QuipError::Config(
                "connect.channels must name at least one channel".into(),
            ));
        }
        Ok(())
    }
}

// ── Connect ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// Server hostname.
    pub server: String,
    pub port: u16,
    /// Channels joined on welcome.
    pub channels: Vec<String>,
    pub nickname: String,
    pub realname: String,
    /// Whether to retry after an unexpected disconnect.
    pub reconnect: bool,
    /// Delay before the first reconnect attempt, and between attempts, in seconds.
    pub reconnect_interval: u64,
    /// Attempts before giving up for good.
    pub reconnect_attempts: u32,
    /// Keepalive probe period in seconds.
    pub ping_interval: u64,
    /// Unanswered probes tolerated before the link is declared dead.
    pub ping_limit: u32,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 6667,
            channels: vec![],
            nickname: "quip".into(),
            realname: "quip".into(),
            reconnect: true,
            reconnect_interval: 30,
            reconnect_attempts: 5,
            ping_interval: 60,
            ping_limit: 3,
        }
    }
}

// ── Scripts ────────────────────────────────────────────────────

/// The `[scripts]` table. Apart from the global enablement default, keys are
/// free-form `<script>_<param>` entries read through typed accessors with a
/// per-key fallback, so scripts the binary doesn't know about don't break
/// parsing and absent keys don't require boilerplate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Enablement fallback for scripts without an explicit `enable_<name>` key.
    pub enable_default: bool,
    #[serde(flatten)]
    settings: HashMap<String, toml::Value>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            enable_default: true,
            settings: HashMap::new(),
        }
    }
}

impl ScriptsConfig {
    /// Whether the named script should be loaded. A present-but-mistyped
    /// `enable_<name>` key is an error, not a silent fallback.
    pub fn enabled(&self, script: &str) -> Result<bool> {
        self.get_bool(&format!("enable_{script}"), self.enable_default)
    }

    pub fn get_str(&self, key: &str, fallback: &str) -> Result<String> {
        match self.settings.get(key) {
            None => Ok(fallback.to_string()),
            Some(toml::Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Self::type_err(key, "string")),
        }
    }

    pub fn get_int(&self, key: &str, fallback: i64) -> Result<i64> {
        match self.settings.get(key) {
            None => Ok(fallback),
            Some(toml::Value::Integer(n)) => Ok(*n),
            Some(_) => Err(Self::type_err(key, "integer")),
        }
    }

    pub fn get_float(&self, key: &str, fallback: f64) -> Result<f64> {
        match self.settings.get(key) {
            None => Ok(fallback),
            Some(toml::Value::Float(f)) => Ok(*f),
            Some(toml::Value::Integer(n)) => Ok(*n as f64),
            Some(_) => Err(Self::type_err(key, "float")),
        }
    }

    pub fn get_bool(&self, key: &str, fallback: bool) -> Result<bool> {
        match self.settings.get(key) {
            None => Ok(fallback),
            Some(toml::Value::Boolean(b)) => Ok(*b),
            Some(_) => Err(Self::type_err(key, "boolean")),
        }
    }

    /// Resolve one declared script parameter. The key is `<script>_<name>`;
    /// the declared default supplies both the expected type and the fallback.
    pub fn resolve_param(
        &self,
        script: &str,
        name: &str,
        default: ParamDefault,
    ) -> Result<ParamValue> {
        let key = format!("{script}_{name}");
        Ok(match default {
            ParamDefault::Str(d) => ParamValue::Str(self.get_str(&key, d)?),
            ParamDefault::Int(d) => ParamValue::Int(self.get_int(&key, d)?),
            ParamDefault::Float(d) => ParamValue::Float(self.get_float(&key, d)?),
            ParamDefault::Bool(d) => ParamValue::Bool(self.get_bool(&key, d)?),
        })
    }

    /// Test scaffolding: set a raw key.
    pub fn set(&mut self, key: &str, value: toml::Value) {
        self.settings.insert(key.to_string(), value);
    }

    fn type_err(key: &str, expected: &'static str) -> QuipError {
        QuipError::Config(format!("scripts.{key} must be a {expected}"))
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG / --log-level are absent.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
