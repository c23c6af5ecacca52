//! Few-shot example selection — ranks stored quotes and renders them as
//! prompt blocks for the completion call.

use crate::models::quote::Quote;

/// Placeholder for the interpreted line when a quote never had one.
const OMITTED_TOKEN: &str = "(omitted)";

/// Engagement score: `(likes+1) × (reposts+1) × (quoted_reposts+1)`.
///
/// The +1 floor keeps zero-engagement quotes at score 1 so new entries are
/// never mathematically excluded, while the product rewards quotes strong
/// on all three axes over quotes strong on only one.
pub fn engagement_score(quote: &Quote) -> i64 {
    (quote.likes + 1) * (quote.reposts + 1) * (quote.quoted_reposts + 1)
}

/// Renders the top `count` quotes by engagement score as three-line blocks
/// separated by blank lines. Returns an empty string for an empty
/// collection; the orchestrator substitutes a hardcoded default example.
pub fn format_examples(quotes: &[Quote], count: usize) -> String {
    if quotes.is_empty() {
        return String::new();
    }

    let mut ranked: Vec<&Quote> = quotes.iter().collect();
    // sort_by is stable: equal scores keep input order, so curated seed
    // quotes loaded ahead of user submissions win ties in the prompt.
    ranked.sort_by(|a, b| engagement_score(b).cmp(&engagement_score(a)));

    ranked
        .iter()
        .take(count)
        .map(|quote| render_block(quote))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_block(quote: &Quote) -> String {
    let interpreted = quote.interpreted.as_deref().unwrap_or(OMITTED_TOKEN);
    format!(
        "Persona \"{}\"\nInterpreted \"{}\"\nOfficial \"{}\"",
        quote.original, interpreted, quote.official
    )
}
