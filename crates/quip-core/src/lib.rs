//! # quip-core
//!
//! Core types, traits, and primitives for the quip chat bot.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod cache;
pub mod error;
pub mod reply;
pub mod script;
pub mod text;

pub use cache::RateLimitedCache;
pub use error::{QuipError, Result};
pub use reply::Reply;
pub use script::{
    ParamDefault, ParamKind, ParamSpec, ParamValue, ResolvedParams, Script, ScriptDescriptor,
};
