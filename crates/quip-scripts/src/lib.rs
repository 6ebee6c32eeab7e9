//! # quip-scripts
//!
//! The script system. Each script implements the `Script` trait from
//! quip-core and is registered in a compile-time descriptor table consumed by
//! [`ScriptRegistry`]. The registry owns instantiation from config, uniform
//! dispatch, per-script error isolation, and `!help` resolution.

pub mod choose;
pub mod eightball;
pub mod insult;
pub mod markov;
pub mod registry;
pub mod remind;
pub mod replace;
pub mod weather;

pub use markov::MarkovEngine;
pub use registry::ScriptRegistry;
pub use remind::ReminderStore;
pub use replace::ReplaceCache;
