use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The nine lineup display slots, as fielding positions. Quotes carrying a
/// label outside this set (pitching roles like "SP") are never bound to a
/// slot by label but remain eligible as unlabeled filler.
pub const SLOT_LABELS: [&str; 9] = ["RF", "LF", "CF", "3B", "1B", "2B", "SS", "C", "DH"];

/// A persisted quote: the submitter's phrase plus the two model-generated
/// lines, with engagement counters and an optional lineup slot label.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quote {
    pub id: i64,
    pub original: String,
    pub interpreted: Option<String>,
    pub official: String,
    pub likes: i64,
    pub reposts: i64,
    pub quoted_reposts: i64,
    pub slot_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A quote as handed to the store — the store assigns the id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuote {
    pub original: String,
    pub interpreted: Option<String>,
    pub official: String,
    #[serde(default)]
    pub slot_label: Option<String>,
}

impl Quote {
    /// Three-line rendering used for social repost links.
    pub fn share_text(&self) -> String {
        let mut text = format!("Persona \"{}\"\n", self.original);
        if let Some(interpreted) = &self.interpreted {
            text.push_str(&format!("Interpreted \"{interpreted}\"\n"));
        }
        text.push_str(&format!("Official \"{}\"", self.official));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(interpreted: Option<&str>) -> Quote {
        Quote {
            id: 1,
            original: "just doing my best".to_string(),
            interpreted: interpreted.map(String::from),
            official: "Defeat is not an option".to_string(),
            likes: 0,
            reposts: 0,
            quoted_reposts: 0,
            slot_label: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_share_text_includes_all_three_lines() {
        let text = quote(Some("Watch me rewrite destiny itself")).share_text();
        assert!(text.starts_with("Persona \"just doing my best\""));
        assert!(text.contains("Interpreted \"Watch me rewrite destiny itself\""));
        assert!(text.ends_with("Official \"Defeat is not an option\""));
    }

    #[test]
    fn test_share_text_skips_missing_interpreted_line() {
        let text = quote(None).share_text();
        assert!(!text.contains("Interpreted"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_slot_label_set_has_nine_known_labels() {
        assert_eq!(SLOT_LABELS.len(), 9);
        assert!(SLOT_LABELS.contains(&"CF"));
        assert!(!SLOT_LABELS.contains(&"SP"), "pitching roles are not lineup slots");
    }
}
