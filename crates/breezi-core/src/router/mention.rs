//! Explicit `@persona` mention detection.
//!
//! First match in catalog order wins, so a message mentioning two personas is
//! answered by the higher-priority one.

use crate::catalog::PersonaCatalog;

/// Returns the id of the first persona whose `@alias` appears in `text`
/// (case-insensitive), scanning personas in catalog order.
pub fn parse(catalog: &PersonaCatalog, text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for persona in catalog.personas() {
        for alias in &persona.aliases {
            let needle = format!("@{}", alias.to_lowercase());
            if lower.contains(&needle) {
                tracing::debug!(target: "breezi::router", persona = %persona.id, alias = %alias, "mention detected");
                return Some(persona.id.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_and_latin_aliases_match() {
        let catalog = PersonaCatalog::default();
        assert_eq!(parse(&catalog, "@루미 hello").as_deref(), Some("char_1"));
        assert_eq!(parse(&catalog, "hey @Lumi!").as_deref(), Some("char_1"));
        assert_eq!(parse(&catalog, "@카이 도와줘").as_deref(), Some("char_2"));
        assert_eq!(parse(&catalog, "@리오 궁금해").as_deref(), Some("char_3"));
    }

    #[test]
    fn mention_reaches_the_rhythm_coach() {
        // 리브 is mention-only: automatic routing skips it, but an explicit
        // call must still land.
        let catalog = PersonaCatalog::default();
        assert_eq!(parse(&catalog, "@리브 오늘 루틴 어땠어?").as_deref(), Some("char_4"));
        assert_eq!(parse(&catalog, "hey @Rib, how was my day?").as_deref(), Some("char_4"));
    }

    #[test]
    fn no_mention_returns_none() {
        let catalog = PersonaCatalog::default();
        assert_eq!(parse(&catalog, "루미 without the at-sign"), None);
        assert_eq!(parse(&catalog, "just a normal message"), None);
    }

    #[test]
    fn first_mention_in_catalog_order_wins() {
        let catalog = PersonaCatalog::default();
        // Both mentioned: char_1 precedes char_3 in the catalog.
        assert_eq!(parse(&catalog, "@레오 @루미 둘 다 궁금해").as_deref(), Some("char_1"));
    }
}
