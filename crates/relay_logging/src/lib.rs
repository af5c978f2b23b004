#![deny(missing_docs)]
//! Shared logging utilities for the sidechat workspace.
//!
//! This crate provides the `relay_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with a per-thread context label so interleaved output from the
//! background, panel, content and ui contexts stays attributable.

use std::cell::Cell;

thread_local! {
    /// Thread-local label naming the context the current thread runs.
    static CONTEXT: Cell<&'static str> = const { Cell::new("-") };
}

/// Sets the context label for the current thread.
/// Each runtime thread should call this once before entering its event loop.
pub fn set_context(label: &'static str) {
    CONTEXT.with(|v| v.set(label));
}

/// Retrieves the context label for the current thread.
/// Returns `"-"` if the label has not been set.
pub fn context() -> &'static str {
    CONTEXT.with(|v| v.get())
}

/// Logs a trace-level message prefixed with the thread's context label.
#[macro_export]
macro_rules! relay_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::context(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message prefixed with the thread's context label.
#[macro_export]
macro_rules! relay_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::context(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message prefixed with the thread's context label.
#[macro_export]
macro_rules! relay_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::context(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message prefixed with the thread's context label.
#[macro_export]
macro_rules! relay_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::context(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message prefixed with the thread's context label.
#[macro_export]
macro_rules! relay_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::context(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
