//! Script discovery, configuration-driven instantiation, and uniform
//! dispatch.
//!
//! Discovery is a compile-time table: every bundled script contributes a
//! `ScriptDescriptor` naming its typed parameters and factory. `load`
//! builds a whole new registry from config, so a reload is an atomic swap
//! at the call site rather than an in-place edit that dispatch could
//! observe half-done.

use tracing::{debug, info, warn};

use quip_config::ScriptsConfig;
use quip_core::{Reply, ResolvedParams, Script, ScriptDescriptor};

use crate::{choose, eightball, insult, markov, remind, replace, weather};

/// Every script this build knows about, in registration (and dispatch) order.
pub static DESCRIPTORS: &[&ScriptDescriptor] = &[
    &markov::DESCRIPTOR,
    &remind::DESCRIPTOR,
    &replace::DESCRIPTOR,
    &weather::DESCRIPTOR,
    &eightball::DESCRIPTOR,
    &choose::DESCRIPTOR,
    &insult::DESCRIPTOR,
];

/// The loaded script set. Owned by the supervisor's event loop; handlers are
/// invoked strictly sequentially, so scripts never need internal locking.
pub struct ScriptRegistry {
    scripts: Vec<Box<dyn Script>>,
}

impl Default for ScriptRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ScriptRegistry {
    /// A registry with nothing loaded.
    pub fn empty() -> Self {
        Self {
            scripts: Vec::new(),
        }
    }

    /// Instantiate every enabled script from config. One bad script —
    /// mistyped enablement key, unresolvable parameter, failing factory —
    /// is logged and omitted without aborting the others.
    pub fn load(config: &ScriptsConfig) -> Self {
        let mut scripts: Vec<Box<dyn Script>> = Vec::new();
        for desc in DESCRIPTORS {
            match config.enabled(desc.name) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(script = desc.name, "script disabled");
                    continue;
                }
                Err(e) => {
                    warn!(script = desc.name, error = %e, "bad enablement key, skipping script");
                    continue;
                }
            }
            let mut params = ResolvedParams::new();
            let mut resolved = true;
            for spec in desc.params {
                match config.resolve_param(desc.name, spec.name, spec.default) {
                    Ok(value) => params.insert(spec.name, value),
                    Err(e) => {
                        warn!(script = desc.name, param = spec.name, error = %e,
                              "bad parameter, skipping script");
                        resolved = false;
                        break;
                    }
                }
            }
            if !resolved {
                continue;
            }
            match (desc.factory)(&params) {
                Ok(script) => scripts.push(script),
                Err(e) => {
                    warn!(script = desc.name, error = %e, "script construction failed, skipping");
                }
            }
        }
        info!(count = scripts.len(), "scripts loaded");
        Self { scripts }
    }

    /// Register an already-built script. Test scaffolding; production loads
    /// go through [`ScriptRegistry::load`].
    pub fn push(&mut self, script: Box<dyn Script>) {
        self.scripts.push(script);
    }

    /// Drop every loaded script.
    pub fn clear(&mut self) {
        self.scripts.clear();
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Names of the loaded scripts, in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.scripts.iter().map(|s| s.name()).collect()
    }

    /// Hand an inbound channel message to every loaded script in order,
    /// collecting the non-empty replies. A handler error is logged and the
    /// remaining scripts still run. `!help` is resolved here, ahead of the
    /// scripts, as a reserved pseudo-command.
    pub async fn dispatch_message(&mut self, nick: &str, channel: &str, text: &str) -> Vec<Reply> {
        let mut replies = Vec::new();
        if let Some(help) = self.help_reply(text) {
            replies.push(Reply::One(help));
        }
        for script in &mut self.scripts {
            match script.on_message(nick, channel, text).await {
                Ok(Some(reply)) if !reply.is_empty() => replies.push(reply),
                Ok(_) => {}
                Err(e) => {
                    warn!(script = script.name(), error = %e, "script message handler failed");
                }
            }
        }
        replies
    }

    /// Give every loaded script its periodic chance to emit unsolicited
    /// output for `channel`, with the same isolation contract as
    /// [`ScriptRegistry::dispatch_message`].
    pub async fn dispatch_poll(&mut self, channel: &str) -> Vec<Reply> {
        let mut replies = Vec::new();
        for script in &mut self.scripts {
            match script.on_poll(channel).await {
                Ok(Some(reply)) if !reply.is_empty() => replies.push(reply),
                Ok(_) => {}
                Err(e) => {
                    warn!(script = script.name(), error = %e, "script poll handler failed");
                }
            }
        }
        replies
    }

    /// Resolve `!help [script]`. Unknown or unloaded names get an explicit
    /// "unknown or inactive" reply, distinct from a loaded script that never
    /// registered help text.
    fn help_reply(&self, text: &str) -> Option<String> {
        let mut words = text.split_whitespace();
        if words.next() != Some("!help") {
            return None;
        }
        let reply = match words.next() {
            None => format!("Scripts: {}", self.names().join(", ")),
            Some(name) => {
                if !self.scripts.iter().any(|s| s.name() == name) {
                    format!("Unknown or inactive script: {name}")
                } else {
                    match DESCRIPTORS.iter().find(|d| d.name == name).and_then(|d| d.help) {
                        Some(help) => help.to_string(),
                        None => format!("No help registered for {name}"),
                    }
                }
            }
        };
        Some(reply)
    }
}
