//! # quip-runtime
//!
//! The connection supervisor: owns the transport, the script registry, and
//! the session lifecycle. One task drives everything — inbound events, the
//! one-second poll tick, keepalive probes, bounded reconnects, and config
//! reloads all interleave on a single loop, so scripts never need locks.

pub mod supervisor;

pub use supervisor::{ConnectionSupervisor, ReloadHandle};
