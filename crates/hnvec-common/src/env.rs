//! Environment value parsing
//!
//! Settings are read leniently: a value that cannot be understood falls back to
//! the caller's default instead of failing startup.

/// Parse a boolean flag.
///
/// Accepts `1`, `true`, `yes`, `y`, `on` and `0`, `false`, `no`, `n`, `off`
/// (case-insensitive, surrounding whitespace ignored).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a strictly positive decimal integer made of ASCII digits only.
pub fn parse_positive(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().filter(|n| *n > 0)
}

/// Read a non-empty string variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
