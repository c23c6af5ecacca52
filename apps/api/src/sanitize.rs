//! Input sanitization — the only gate between raw user text and the pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns that get a submission rejected outright.
static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)data:text/html",
        r"(?i)vbscript:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Escapes HTML-significant characters so stored text is inert when rendered.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Strips control characters (newline and tab are kept) and HTML-escapes.
pub fn sanitize_input(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    escape_html(&cleaned)
}

/// Validates a submission before any pipeline work happens.
/// `max_chars` is the configured input cap, counted in characters.
pub fn validate_input(input: &str, max_chars: usize) -> Result<(), String> {
    if input.trim().is_empty() {
        return Err("input must not be empty".to_string());
    }
    if input.chars().count() > max_chars {
        return Err(format!("input must be at most {max_chars} characters"));
    }
    for pattern in DANGEROUS_PATTERNS.iter() {
        if pattern.is_match(input) {
            return Err("input contains a disallowed pattern".to_string());
        }
    }
    Ok(())
}
