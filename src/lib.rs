//! Per-key failure gating.
//!
//! A [`Gate`] decides, for an identifier such as a downstream service name,
//! whether the next attempt may proceed or should be short-circuited because
//! too many attempts were charged against it. Once a key opens it stays open
//! until its cooldown has elapsed since the first rejection, then starts over
//! from zero.

pub mod config;
pub mod gate;
pub mod observability;

pub use config::KeygateConfig;
pub use gate::{Gate, GateRegistry, KeyGate, KeyStatus, ShardedGate};
