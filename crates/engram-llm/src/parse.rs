//! Parsing of model output into typed results.
//!
//! Models return loosely formatted text; these helpers are lenient and
//! degrade to fewer results rather than failing.

use engram_types::llm::{ExtractedEntity, Intent};

/// Parse a bullet list of entities: each line `- <name> (<type>)`.
/// Lines without a parenthesized type default to "Entity"; duplicates
/// (case-insensitive name+type) are dropped.
pub fn parse_entity_lines(out: &str) -> Vec<ExtractedEntity> {
    let mut entities = Vec::new();
    for line in out.lines() {
        let line = line.trim();
        let Some(body) = line.strip_prefix('-') else {
            continue;
        };
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        let entity = match body.rsplit_once('(') {
            Some((name, rest)) if rest.ends_with(')') => ExtractedEntity {
                name: name.trim().to_string(),
                entity_type: rest.trim_end_matches(')').trim().to_string(),
            },
            _ => ExtractedEntity {
                name: body.to_string(),
                entity_type: "Entity".to_string(),
            },
        };
        if entity.name.is_empty() {
            continue;
        }
        entities.push(entity);
    }

    let mut seen = std::collections::HashSet::new();
    entities.retain(|e| {
        seen.insert((e.name.to_lowercase(), e.entity_type.to_lowercase()))
    });
    entities
}

/// Parse an intent from model output. Accepts a bare JSON object or one
/// embedded in surrounding prose; absent fields and unparsable output
/// fall back to the defaults.
pub fn parse_intent(out: &str) -> Intent {
    let candidate = match (out.find('{'), out.rfind('}')) {
        (Some(start), Some(end)) if end > start => &out[start..=end],
        _ => return Intent::default(),
    };
    serde_json::from_str(candidate).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities_with_types() {
        let out = "- Alice (Person)\n- Acme Corp (Org)\nnot a bullet\n- Redis";
        let entities = parse_entity_lines(out);
        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0].name, "Alice");
        assert_eq!(entities[0].entity_type, "Person");
        assert_eq!(entities[2].entity_type, "Entity");
    }

    #[test]
    fn test_parse_entities_dedupes() {
        let out = "- Alice (Person)\n- alice (person)\n- Alice (Org)";
        let entities = parse_entity_lines(out);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_parse_intent_embedded_json() {
        let intent = parse_intent("Sure! {\"hops\": 3, \"token_budget\": 900} as requested.");
        assert_eq!(intent.hops, 3);
        assert_eq!(intent.token_budget, 900);
    }

    #[test]
    fn test_parse_intent_fallbacks() {
        assert_eq!(parse_intent("no json here"), Intent::default());
        assert_eq!(parse_intent("{\"hops\": 4}").token_budget, 1500);
        assert_eq!(parse_intent("{broken"), Intent::default());
    }
}
