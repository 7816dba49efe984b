//! Diagnostic output.
//!
//! The client never prints directly. It hands every diagnostic line to a
//! [`DiagnosticSink`]; the default [`LogSink`] forwards to the `log` facade,
//! which stays silent unless the application installs a logger.

use std::fmt;

pub use log::Level;

/// `log` target used by [`LogSink`].
pub const LOG_TARGET: &str = "embedws";

/// Receiver of engine diagnostics.
pub trait DiagnosticSink: Send {
    /// Record one diagnostic line.
    fn emit(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Forwards diagnostics to the `log` crate under [`LOG_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}", args);
    }
}

/// Discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn emit(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}
