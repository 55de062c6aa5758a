//! Context assembly from similarity matches.
//!
//! Turns the raw matches of a vector query into the context string handed to
//! the chat model:
//!
//! 1. Keep matches whose score is strictly greater than the threshold.
//! 2. Order them by score, highest first.
//! 3. Resolve each match's text from its metadata ([`MATCH_TEXT_FIELDS`]).
//! 4. Join with newlines and cut to `max_chars` characters.
//! 5. Fall back to [`NO_RELEVANT_CONTEXT`] when the result is empty.
//!
//! The sentinel lets the consumer tell "nothing relevant" apart from a failed
//! retrieval, which is reported as an error instead.

use std::cmp::Ordering;

use crate::models::Match;

/// Returned when no match clears the threshold.
pub const NO_RELEVANT_CONTEXT: &str = "No relevant context found.";

/// Metadata fields holding chunk text, in order of precedence.
///
/// A field that is absent, not a string, or empty falls through to the next.
pub const MATCH_TEXT_FIELDS: [&str; 2] = ["text", "originalText"];

/// Filtering and length limits for context assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextParams {
    /// Matches must score strictly above this value.
    pub score_threshold: f32,
    /// Maximum length of the assembled context, in characters.
    pub max_chars: usize,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            max_chars: 3000,
        }
    }
}

/// Matches scoring above `threshold`, best first. Ties keep query order.
pub fn qualifying_matches(matches: &[Match], threshold: f32) -> Vec<&Match> {
    let mut kept: Vec<&Match> = matches.iter().filter(|m| m.score > threshold).collect();
    kept.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    kept
}

/// Text stored on a match, or `""` when no usable field exists.
pub fn match_text(m: &Match) -> &str {
    MATCH_TEXT_FIELDS
        .iter()
        .filter_map(|field| m.metadata.get(*field).and_then(|v| v.as_str()))
        .find(|text| !text.is_empty())
        .unwrap_or("")
}

/// Build the context string for a set of query matches.
pub fn assemble_context(matches: &[Match], params: &ContextParams) -> String {
    let qualifying = qualifying_matches(matches, params.score_threshold);
    let joined = qualifying
        .iter()
        .map(|m| match_text(m))
        .collect::<Vec<_>>()
        .join("\n");

    let context: String = joined.chars().take(params.max_chars).collect();
    if context.is_empty() {
        NO_RELEVANT_CONTEXT.to_string()
    } else {
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: &str, score: f32, metadata: serde_json::Value) -> Match {
        Match {
            id: id.to_string(),
            score,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_filters_at_or_below_threshold() {
        let matches = vec![
            hit("a", 0.9, json!({"originalText": "keep"})),
            hit("b", 0.5, json!({"originalText": "edge"})),
            hit("c", 0.1, json!({"originalText": "drop"})),
        ];
        let ctx = assemble_context(&matches, &ContextParams::default());
        assert_eq!(ctx, "keep");
    }

    #[test]
    fn test_orders_by_score_descending() {
        let matches = vec![
            hit("low", 0.6, json!({"originalText": "second"})),
            hit("high", 0.95, json!({"originalText": "first"})),
            hit("mid", 0.8, json!({"originalText": "middle"})),
        ];
        let ctx = assemble_context(&matches, &ContextParams::default());
        assert_eq!(ctx, "first\nmiddle\nsecond");
    }

    #[test]
    fn test_field_precedence() {
        let both = hit("a", 1.0, json!({"text": "from text", "originalText": "from original"}));
        assert_eq!(match_text(&both), "from text");

        let empty_text = hit("b", 1.0, json!({"text": "", "originalText": "fallback"}));
        assert_eq!(match_text(&empty_text), "fallback");

        let non_string = hit("c", 1.0, json!({"text": 42, "originalText": "fallback"}));
        assert_eq!(match_text(&non_string), "fallback");

        let nothing = hit("d", 1.0, json!({"pageNumber": 1}));
        assert_eq!(match_text(&nothing), "");
    }

    #[test]
    fn test_sentinel_when_nothing_qualifies() {
        let matches = vec![hit("a", 0.2, json!({"originalText": "weak"}))];
        assert_eq!(
            assemble_context(&matches, &ContextParams::default()),
            NO_RELEVANT_CONTEXT
        );
        assert_eq!(
            assemble_context(&[], &ContextParams::default()),
            NO_RELEVANT_CONTEXT
        );
    }

    #[test]
    fn test_sentinel_when_qualifying_matches_have_no_text() {
        let matches = vec![hit("a", 0.9, json!({}))];
        assert_eq!(
            assemble_context(&matches, &ContextParams::default()),
            NO_RELEVANT_CONTEXT
        );
    }

    #[test]
    fn test_truncates_to_max_chars() {
        let long = "é".repeat(5000);
        let matches = vec![
            hit("a", 0.9, json!({"originalText": long})),
            hit("b", 0.8, json!({"originalText": "tail"})),
        ];
        let ctx = assemble_context(&matches, &ContextParams::default());
        assert_eq!(ctx.chars().count(), 3000);
        assert!(!ctx.contains("tail"));
    }

    #[test]
    fn test_threshold_monotonicity() {
        let matches: Vec<Match> = (0..20)
            .map(|i| hit(&i.to_string(), i as f32 / 20.0, json!({"originalText": "t"})))
            .collect();
        let mut previous = usize::MAX;
        for step in 0..=20 {
            let count = qualifying_matches(&matches, step as f32 / 20.0).len();
            assert!(count <= previous);
            previous = count;
        }
    }
}
