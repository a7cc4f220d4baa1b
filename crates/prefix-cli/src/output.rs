//! CLI output formatting with colors and styling.
//!
//! Respects NO_COLOR and FORCE_COLOR environment variables.
//! Colors are automatically disabled when output is piped.

use colored::{ColoredString, Colorize};

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

// === Error Output ===

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn warn_label() -> ColoredString {
    "warning".yellow().bold()
}

pub fn trace_label() -> ColoredString {
    "trace".cyan()
}

// === Help Output ===

pub fn title(name: &str) -> ColoredString {
    name.bold()
}

pub fn version(v: &str) -> ColoredString {
    v.dimmed()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}

pub fn file_path(path: &str) -> ColoredString {
    path.underline()
}

// === REPL prompt ===

pub fn prompt() -> ColoredString {
    "prefix>".green()
}

pub fn continuation_prompt() -> ColoredString {
    "     ..>".dimmed()
}
