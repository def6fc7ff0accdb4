//! Keyword scoring over the persona catalog.
//!
//! Scores are raw case-insensitive substring counts with uniform weight 1:
//! every occurrence counts, so a message repeating one keyword scores it
//! repeatedly (not a presence-only check). The leader selection reproduces
//! the production tie-break: a persona earlier in catalog order keeps the
//! lead on ties (persona #1 wins `{2, 2, 0}`), and an all-zero scoreboard
//! falls back to the default persona. Mention-only personas are not scored.

use crate::catalog::{Persona, PersonaCatalog};

/// Counts occurrences of every keyword of `persona` in `text`
/// (case-insensitive; a keyword appearing twice counts twice).
pub fn score(persona: &Persona, text: &str) -> usize {
    let lower = text.to_lowercase();
    persona
        .keywords
        .iter()
        .map(|kw| count_occurrences(&lower, &kw.to_lowercase()))
        .sum()
}

/// Scores every routable persona, in catalog order.
pub fn score_all(catalog: &PersonaCatalog, text: &str) -> Vec<(String, usize)> {
    catalog
        .routable_personas()
        .map(|p| (p.id.clone(), score(p, text)))
        .collect()
}

/// Selects the winning persona id from a catalog-ordered scoreboard.
///
/// Persona i wins when its score is > 0 and >= every later persona's score;
/// earlier personas therefore keep leadership on ties. Returns `None` when
/// every score is zero (caller selects the default persona).
pub fn select(scores: &[(String, usize)]) -> Option<&str> {
    for (i, (id, s)) in scores.iter().enumerate() {
        if *s > 0 && scores[i + 1..].iter().all(|(_, other)| *s >= *other) {
            return Some(id);
        }
    }
    None
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.find(needle) {
        count += 1;
        rest = &rest[pos + needle.len()..];
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_counts_are_raw_occurrences() {
        let catalog = PersonaCatalog::default();
        let lumi = catalog.get("char_1").unwrap();
        // "힘들" twice ("힘들어" also contains "힘들"), "우울" once.
        assert_eq!(score(lumi, "요즘 너무 힘들고 우울해. 정말 힘들어."), 4);
        assert_eq!(score(lumi, "오늘 점심 뭐 먹지"), 0);
    }

    #[test]
    fn ties_go_to_the_earlier_persona() {
        let scores = vec![
            ("char_1".to_string(), 2),
            ("char_2".to_string(), 2),
            ("char_3".to_string(), 0),
        ];
        assert_eq!(select(&scores), Some("char_1"));
    }

    #[test]
    fn later_persona_needs_a_strictly_better_score() {
        let scores = vec![
            ("char_1".to_string(), 1),
            ("char_2".to_string(), 3),
            ("char_3".to_string(), 3),
        ];
        assert_eq!(select(&scores), Some("char_2"));
    }

    #[test]
    fn all_zero_yields_none() {
        let scores = vec![
            ("char_1".to_string(), 0),
            ("char_2".to_string(), 0),
            ("char_3".to_string(), 0),
        ];
        assert_eq!(select(&scores), None);
    }
}
