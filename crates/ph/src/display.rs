//! Terminal output helpers
//!
//! ANSI colors with TTY detection, timestamp shortening, and one-line
//! truncation for table cells.

use chrono::DateTime;

/// ANSI color codes (empty strings when output is not a terminal)
pub struct Colors {
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub cyan: &'static str,
    pub bold: &'static str,
    pub dim: &'static str,
    pub reset: &'static str,
}

impl Colors {
    pub fn new(color_enabled: bool) -> Self {
        if color_enabled {
            Self {
                red: "\x1b[0;31m",
                green: "\x1b[0;32m",
                yellow: "\x1b[0;33m",
                cyan: "\x1b[0;36m",
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                red: "",
                green: "",
                yellow: "",
                cyan: "",
                bold: "",
                dim: "",
                reset: "",
            }
        }
    }

    /// Get colors based on TTY detection
    pub fn auto() -> Self {
        Self::new(is_tty())
    }
}

/// Check if stdout is a TTY
fn is_tty() -> bool {
    #[cfg(unix)]
    unsafe {
        libc::isatty(libc::STDOUT_FILENO) != 0
    }

    #[cfg(not(unix))]
    true
}

/// Collapse newlines to spaces and cap at `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    flat.chars().take(max).collect()
}

/// Shorten a stored RFC 3339 timestamp for humans; unparseable input
/// passes through untouched
pub fn short_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// First eight characters of a commit hash
pub fn short_commit(hash: &str) -> String {
    hash.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_collapses_newlines() {
        assert_eq!(truncate("a\nb\r\nc", 120), "a b  c");
    }

    #[test]
    fn test_truncate_caps_length() {
        let long = "x".repeat(200);
        assert_eq!(truncate(&long, 120).chars().count(), 120);
        assert_eq!(truncate("short", 120), "short");
    }

    #[test]
    fn test_short_timestamp() {
        assert_eq!(
            short_timestamp("2025-03-01T09:30:12.123456+00:00"),
            "2025-03-01 09:30"
        );
        assert_eq!(short_timestamp("never"), "never");
    }

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("0123456789abcdef"), "01234567");
        assert_eq!(short_commit("abc"), "abc");
    }
}
