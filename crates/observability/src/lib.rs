//! Tracing/logging setup shared by the workspace binaries.

/// Initialize process-wide logging in the given format.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, ParseLogFormatError};
