//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KeygateConfig (validated, immutable)
//!     → GateRegistry::from_config builds one shared gate per table
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Durations are plain millisecond integers

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{GateConfig, KeygateConfig, LogFormat, ObservabilityConfig};
pub use validation::ValidationError;
