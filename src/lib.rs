// watchconf - persistent section-keyed configuration store
//
// This crate owns a structured configuration file on disk plus a process-wide
// in-memory mirror, and reconciles the two: first-run initialization with
// randomized defaults, whole-section rewrites, single-key updates, and
// schema-evolution merges against a shipped default template.

pub mod defaults;
pub mod document;
pub mod error;
pub mod live;
pub mod logging;
pub mod metrics;
pub mod schema;
pub mod store;

// Re-export commonly used types for convenience
pub use document::ConfigDocument;
pub use error::{ConfigError, ConfigResult};
pub use live::{ConfigChange, ConfigValue, LiveConfig, LiveSnapshot};
pub use store::ConfigStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
