use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{QuipError, Result};
use crate::reply::Reply;

/// The type of a declared script parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
}

/// The fallback used when a declared parameter is absent from config.
/// Doubles as the parameter's type declaration.
#[derive(Debug, Clone, Copy)]
pub enum ParamDefault {
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamDefault {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamDefault::Str(_) => ParamKind::Str,
            ParamDefault::Int(_) => ParamKind::Int,
            ParamDefault::Float(_) => ParamKind::Float,
            ParamDefault::Bool(_) => ParamKind::Bool,
        }
    }
}

/// A single typed parameter a script pulls from the `[scripts]` config table.
/// Declared as static data on the descriptor and resolved uniformly by the
/// registry before the factory runs. The config key is `<script>_<name>`.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: ParamDefault,
}

impl ParamSpec {
    pub const fn new(name: &'static str, default: ParamDefault) -> Self {
        Self { name, default }
    }

    pub fn kind(&self) -> ParamKind {
        self.default.kind()
    }
}

/// A resolved parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// The parameter set handed to a script factory, with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct ResolvedParams {
    values: HashMap<String, ParamValue>,
}

impl ResolvedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(s)) => Ok(s),
            _ => Err(Self::type_err(name, "str")),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(n)) => Ok(*n),
            _ => Err(Self::type_err(name, "int")),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.values.get(name) {
            Some(ParamValue::Float(f)) => Ok(*f),
            Some(ParamValue::Int(n)) => Ok(*n as f64),
            _ => Err(Self::type_err(name, "float")),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.values.get(name) {
            Some(ParamValue::Bool(b)) => Ok(*b),
            _ => Err(Self::type_err(name, "bool")),
        }
    }

    fn type_err(key: &str, expected: &'static str) -> QuipError {
        QuipError::ConfigType {
            key: key.to_string(),
            expected,
        }
    }
}

/// Trait implemented by every bundled script.
///
/// Both handlers default to no-ops, so a script implements only the subset it
/// cares about. Handlers take `&mut self`: the registry dispatches to each
/// script strictly sequentially, so no two handlers for the same instance ever
/// run concurrently.
#[async_trait]
pub trait Script: Send {
    /// Unique script name, matching its descriptor.
    fn name(&self) -> &'static str;

    /// Called for every public channel message.
    async fn on_message(
        &mut self,
        _sender: &str,
        _channel: &str,
        _text: &str,
    ) -> Result<Option<Reply>> {
        Ok(None)
    }

    /// Called once per channel on every poll tick, for unsolicited output.
    async fn on_poll(&mut self, _channel: &str) -> Result<Option<Reply>> {
        Ok(None)
    }
}

/// Compile-time descriptor for a script: its name, declared typed parameters,
/// optional help text, and a factory that builds an instance from resolved
/// parameters. The registry owns a static table of these.
pub struct ScriptDescriptor {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub help: Option<&'static str>,
    pub factory: fn(&ResolvedParams) -> Result<Box<dyn Script>>,
}
