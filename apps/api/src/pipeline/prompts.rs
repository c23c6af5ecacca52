//! Prompt constants and builders for the generation pipeline.

/// Stored examples appended after the fixed set, capped to keep the prompt
/// light for the small completion model.
const MAX_STORED_EXAMPLE_BLOCKS: usize = 2;

/// Fixed few-shot examples, always present ahead of any stored quotes.
const FIXED_EXAMPLES: &str = r#"Persona "I didn't do anything special, I just hope people enjoy watching."
Interpreted "Hey everyone, take notes. This is how it's done."
Official "Take notes, all of you"

Persona "It's not about winning or losing, I just give my best every time."
Interpreted "Defeat is not an option for me."
Official "Losing was never on the table"

Persona "If they put their trust in me, I only want to answer it."
Interpreted "Putting me out there is the best move you can make."
Official "Sending me in is the only right call""#;

/// Fallback example used when the store holds no quotes at all.
pub const DEFAULT_EXAMPLE: &str = r#"Persona "I have to truly stop admiring them."
Interpreted "The time for admiration is over, my own legend starts today."
Official "Admiration ends here, now I become the legend""#;

/// System prompt template. Replace `{examples}` before sending.
const GENERATION_SYSTEM_TEMPLATE: &str = r#"ROLE
Rewrite a modest remark into a three-line block (persona, interpreted, official).

LEARNED EXAMPLES
{examples}

OUTPUT FORMAT
Persona "{the input}"
Interpreted "{a complete English sentence, at least 5 words, ending as a full sentence, Hollywood-grade exaggeration}"
Official "{a hot-blooded remark, generated from the interpreted line}"

HARD RULES
1. Output exactly the three lines (persona, interpreted, official).
2. Interpreted line:
   - a complete sentence of at least 5 words (subject + verb + object or complement)
   - short fragments are forbidden
   - exaggerate the modest input (nervousness becomes a battlefield, destiny awaits)
   - use different vocabulary on every call
3. Official line:
   - built from the meaning of the interpreted line
   - never reuses the persona's own words
   - bold, punchy, short and memorable"#;

/// User message template. Replace `{input}` before sending.
const GENERATION_USER_TEMPLATE: &str = r#"Render "{input}" as the three-line block:

Persona "{input}"
Interpreted "a complete English sentence (at least 5 words, ends as a full sentence, exaggerated)"
Official "a hot-blooded remark (from the interpreted line, never the persona's words)"

MANDATORY
- The interpreted line is always a complete sentence of at least 5 words.
- Consult the learned examples and use a different expression every time."#;

/// Builds the system prompt: fixed examples first, then at most
/// [`MAX_STORED_EXAMPLE_BLOCKS`] of the selector's rendered blocks.
pub fn build_system_prompt(stored_examples: &str) -> String {
    let stored = stored_examples
        .trim()
        .split("\n\n")
        .filter(|block| !block.is_empty())
        .take(MAX_STORED_EXAMPLE_BLOCKS)
        .collect::<Vec<_>>()
        .join("\n\n");

    let examples = if stored.is_empty() {
        FIXED_EXAMPLES.to_string()
    } else {
        format!("{FIXED_EXAMPLES}\n\n{stored}")
    };

    GENERATION_SYSTEM_TEMPLATE.replace("{examples}", &examples)
}

pub fn build_user_message(input: &str) -> String {
    GENERATION_USER_TEMPLATE.replace("{input}", input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_keeps_fixed_examples_first() {
        let prompt = build_system_prompt("Persona \"a\"\nInterpreted \"b\"\nOfficial \"c\"");
        let fixed_pos = prompt.find("take notes").unwrap();
        let stored_pos = prompt.find("Persona \"a\"").unwrap();
        assert!(fixed_pos < stored_pos);
    }

    #[test]
    fn test_stored_examples_are_capped_at_two_blocks() {
        let blocks = (0..5)
            .map(|i| format!("Persona \"p{i}\"\nInterpreted \"x\"\nOfficial \"o{i}\""))
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_system_prompt(&blocks);
        assert!(prompt.contains("Persona \"p0\""));
        assert!(prompt.contains("Persona \"p1\""));
        assert!(!prompt.contains("Persona \"p2\""));
    }

    #[test]
    fn test_empty_stored_examples_leave_fixed_set_only() {
        let prompt = build_system_prompt("");
        assert!(prompt.contains("Defeat is not an option"));
        assert!(!prompt.contains("{examples}"));
    }

    #[test]
    fn test_user_message_embeds_input() {
        let message = build_user_message("small words");
        assert!(message.contains("Persona \"small words\""));
        assert!(!message.contains("{input}"));
    }
}
