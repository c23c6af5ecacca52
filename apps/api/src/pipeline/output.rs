//! Completion post-processing: extraction, validation, and length governance.
//!
//! The model is instructed to answer with a three-line block (persona /
//! interpreted / official), but free-form drift is common. Each field is
//! therefore extracted by an ordered list of strategies tried until one
//! matches, and the mandatory official field gets an extra cascade of
//! last-resort fallbacks. Every rejection is terminal — the pipeline never
//! retries the model.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

const PERSONA_LABEL: &str = "Persona";
const INTERPRETED_LABEL: &str = "Interpreted";
const OFFICIAL_LABEL: &str = "Official";
const LABELS: [&str; 3] = [PERSONA_LABEL, INTERPRETED_LABEL, OFFICIAL_LABEL];

/// An interpreted line under this many whitespace tokens is an incomplete
/// fragment, not a sentence.
const INTERPRETED_MIN_TOKENS: usize = 5;

/// Per-field and combined length caps, counted in characters.
#[derive(Debug, Clone, Copy)]
pub struct OutputLimits {
    pub interpreted_max: usize,
    pub official_max: usize,
    pub combined_max: usize,
}

/// Parsed and length-governed result of one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFields {
    pub interpreted: Option<String>,
    pub official: String,
}

/// Why a completion was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputRejection {
    #[error("official line missing from completion")]
    MissingOfficial,

    #[error("interpreted line is a fragment ({tokens} tokens, need {INTERPRETED_MIN_TOKENS})")]
    InterpretedFragment { tokens: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction strategies
// ────────────────────────────────────────────────────────────────────────────

struct FieldPatterns {
    /// Label immediately followed by straight-double-quoted content.
    primary: Regex,
    /// Tolerates a separator, curly/corner quote characters and line breaks.
    secondary: Regex,
    /// A whole labeled block of any quote style, for removal.
    strip: Regex,
}

impl FieldPatterns {
    fn new(label: &str) -> Self {
        Self {
            primary: Regex::new(&format!(r#"{label} "([^"]+)""#)).expect("static pattern"),
            secondary: Regex::new(&format!(
                r#"{label}\s*[:：]?\s*["“「]([^"”」]+)["”」]"#
            ))
            .expect("static pattern"),
            strip: Regex::new(&format!(r#"{label}\s*[:：]?\s*["“「][^"”」]*["”」]\s*"#))
                .expect("static pattern"),
        }
    }
}

static PERSONA_PATTERNS: Lazy<FieldPatterns> = Lazy::new(|| FieldPatterns::new(PERSONA_LABEL));
static INTERPRETED_PATTERNS: Lazy<FieldPatterns> =
    Lazy::new(|| FieldPatterns::new(INTERPRETED_LABEL));
static OFFICIAL_PATTERNS: Lazy<FieldPatterns> = Lazy::new(|| FieldPatterns::new(OFFICIAL_LABEL));

/// Any label token, with its optional separator.
static LABEL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Persona|Interpreted|Official)\s*[:：]?\s*").expect("static pattern"));

fn patterns(label: &str) -> &'static FieldPatterns {
    match label {
        PERSONA_LABEL => &PERSONA_PATTERNS,
        INTERPRETED_LABEL => &INTERPRETED_PATTERNS,
        _ => &OFFICIAL_PATTERNS,
    }
}

/// Runs the ordered strategy list for one field; first match wins.
fn extract_field(raw: &str, label: &'static str) -> Option<String> {
    let strategies: [fn(&str, &'static str) -> Option<String>; 3] =
        [extract_primary, extract_secondary, extract_residual];
    strategies.iter().find_map(|extract| extract(raw, label))
}

fn extract_primary(raw: &str, label: &'static str) -> Option<String> {
    capture_trimmed(&patterns(label).primary, raw)
}

fn extract_secondary(raw: &str, label: &'static str) -> Option<String> {
    capture_trimmed(&patterns(label).secondary, raw)
}

/// Last per-field strategy: remove the *other* fields' labeled blocks and
/// treat whatever text remains as this field's value.
fn extract_residual(raw: &str, label: &'static str) -> Option<String> {
    let mut rest = raw.to_string();
    for other in LABELS.iter().filter(|l| **l != label) {
        rest = patterns(other).strip.replace_all(&rest, "").into_owned();
    }
    let rest = trim_quote_chars(rest.trim());
    let rest = trim_quote_chars(strip_leading_label(rest));
    (!rest.is_empty()).then(|| rest.to_string())
}

fn capture_trimmed(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Official-field fallback cascade
// ────────────────────────────────────────────────────────────────────────────

/// The official field is mandatory, so after the three strategies fail we
/// keep digging: (a) content after the second label boundary, (b) everything
/// from the third line onward, (c) the raw text with labels stripped,
/// hard-truncated to the field's own cap.
fn official_fallbacks(raw: &str, official_max: usize) -> Option<String> {
    after_second_label(raw)
        .or_else(|| join_from_third_line(raw))
        .or_else(|| strip_all_labels(raw).map(|s| truncate_chars(&s, official_max)))
}

fn after_second_label(raw: &str) -> Option<String> {
    let mut label_matches = LABEL_TOKEN.find_iter(raw);
    label_matches.next()?;
    let second = label_matches.next()?;
    let rest = trim_quote_chars(raw[second.end()..].trim());
    (!rest.is_empty()).then(|| rest.to_string())
}

fn join_from_third_line(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < 3 {
        return None;
    }
    let joined = lines[2..].join(" ");
    let rest = trim_quote_chars(strip_leading_label(joined.trim()));
    (!rest.is_empty()).then(|| rest.to_string())
}

fn strip_all_labels(raw: &str) -> Option<String> {
    let stripped = LABEL_TOKEN.replace_all(raw, "");
    let rest: String = stripped
        .chars()
        .filter(|c| !is_quote_char(*c))
        .collect::<String>()
        .trim()
        .to_string();
    (!rest.is_empty()).then_some(rest)
}

fn strip_leading_label(s: &str) -> &str {
    match LABEL_TOKEN.find(s) {
        Some(m) if m.start() == 0 => &s[m.end()..],
        _ => s,
    }
}

fn is_quote_char(c: char) -> bool {
    matches!(c, '"' | '“' | '”' | '「' | '」')
}

fn trim_quote_chars(s: &str) -> &str {
    s.trim_matches(|c: char| is_quote_char(c) || c.is_whitespace())
}

// ────────────────────────────────────────────────────────────────────────────
// Length governance
// ────────────────────────────────────────────────────────────────────────────

/// Hard-truncates to `max` characters; no ellipsis.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Applies per-field caps, then scales both fields down proportionally when
/// their sum still exceeds the combined budget. Each field keeps its
/// relative share of the budget instead of one field being cut to zero.
/// A no-op on already-compliant input.
pub fn apply_length_budget(fields: GeneratedFields, limits: &OutputLimits) -> GeneratedFields {
    let mut interpreted = fields
        .interpreted
        .map(|s| truncate_chars(&s, limits.interpreted_max));
    let mut official = truncate_chars(&fields.official, limits.official_max);

    let interpreted_len = interpreted.as_ref().map_or(0, |s| s.chars().count());
    let official_len = official.chars().count();
    let total = interpreted_len + official_len;

    if total > limits.combined_max {
        let ratio = limits.combined_max as f64 / total as f64;
        let interpreted_target =
            ((interpreted_len as f64 * ratio).floor() as usize).min(limits.interpreted_max);
        let official_target =
            ((official_len as f64 * ratio).floor() as usize).min(limits.official_max);

        debug!(
            "combined length {total} over budget {}: scaling to {interpreted_target}+{official_target}",
            limits.combined_max
        );

        interpreted = interpreted.map(|s| truncate_chars(&s, interpreted_target));
        official = truncate_chars(&official, official_target);
    }

    GeneratedFields {
        interpreted,
        official,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Turns one raw completion into bounded, policy-compliant fields, or a
/// classified rejection. Terminal either way — no internal retries.
pub fn process(raw: &str, limits: &OutputLimits) -> Result<GeneratedFields, OutputRejection> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(OutputRejection::MissingOfficial);
    }

    let interpreted = extract_field(raw, INTERPRETED_LABEL);
    let official = extract_field(raw, OFFICIAL_LABEL)
        .or_else(|| official_fallbacks(raw, limits.official_max))
        .ok_or(OutputRejection::MissingOfficial)?;

    // Absence is fine; a present-but-fragmentary interpreted line is not.
    if let Some(text) = &interpreted {
        let tokens = text.split_whitespace().count();
        if tokens < INTERPRETED_MIN_TOKENS {
            return Err(OutputRejection::InterpretedFragment { tokens });
        }
    }

    Ok(apply_length_budget(
        GeneratedFields {
            interpreted,
            official,
        },
        limits,
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
