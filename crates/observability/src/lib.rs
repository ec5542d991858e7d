//! Process-wide tracing setup.

/// Tracing subscriber configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, TracingConfig};

/// Install the default subscriber: JSON lines, filter from `RUST_LOG`, `info` otherwise.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    crate::tracing::init(&TracingConfig::default());
}

/// Same as [`init`] with an explicit configuration.
pub fn init_with(config: &TracingConfig) {
    crate::tracing::init(config);
}
