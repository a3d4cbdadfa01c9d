#![deny(missing_docs)]
//! Shared logging utilities for the agentspace workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a helper for keeping wire payloads readable in log lines, and a minimal
//! test initializer for the global logger.

/// Default number of characters kept by [`preview`].
pub const PREVIEW_CHARS: usize = 160;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Shortens a payload to at most `max_chars` characters for logging.
///
/// Cuts on a character boundary and marks the cut with an ellipsis. Line
/// breaks are escaped so a frame stays on one log line.
pub fn preview(payload: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(payload.len().min(max_chars + 8));
    let mut chars = payload.chars();
    for ch in chars.by_ref().take(max_chars) {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

/// Initializes a simple terminal logger for use in tests.
///
/// The level defaults to debug in debug builds and info in release builds;
/// `AGENTSPACE_TEST_LOG` overrides it (`trace`, `debug`, `info`, `warn`, `error`, `off`).
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let default = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let level = std::env::var("AGENTSPACE_TEST_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default);

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_payloads_intact() {
        assert_eq!(preview(r#"{"event":"RUN_STARTED"}"#, 64), r#"{"event":"RUN_STARTED"}"#);
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 5), "héllo…");
    }

    #[test]
    fn preview_escapes_line_breaks() {
        assert_eq!(preview("a\nb\r\n", 10), "a\\nb\\r\\n");
    }
}
