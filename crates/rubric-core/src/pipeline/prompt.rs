//! Per-level prompt construction.
//!
//! Builds the system and user messages for one step of the taxonomy
//! walk. The system message carries the classification rules, biased by
//! the detected object type; the user message lists the candidates as
//! `code — name` lines and demands a response in the exact JSON shape
//! the verdict parser expects.

use std::fmt::Write as _;

use rubric_types::{Level, ObjectType, TaxonomyNode};

/// A built prompt pair.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System message: role and rules.
    pub system: String,
    /// User message: the item, the candidates, and the response shape.
    pub user: String,
}

impl Prompt {
    /// Combined prompt size in characters, for budgeting.
    pub fn size(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }
}

/// Build the prompt for one level decision.
pub fn build(
    item_name: &str,
    category: Option<&str>,
    level: Level,
    candidates: &[&TaxonomyNode],
    object_type: ObjectType,
) -> Prompt {
    let mut system = String::with_capacity(512);
    system.push_str(
        "You are a catalog classification expert. You assign items from a \
         purchasing catalog (names are typically in Russian) to a fixed \
         hierarchical taxonomy, one level at a time.\n\
         Rules:\n\
         - Pick exactly ONE code from the candidate list. Never invent a code \
           and never answer with a deeper code than the ones listed.\n\
         - Judge by what the item IS, not by who supplies it.\n",
    );
    match object_type {
        ObjectType::Product => system.push_str(
            "- The item is a PHYSICAL GOOD. Do not select codes for services, \
             repair, installation, testing or rental.\n",
        ),
        ObjectType::Service => system.push_str(
            "- The item is a SERVICE. Do not select codes for physical goods \
             or materials.\n",
        ),
        ObjectType::Unknown => {}
    }
    system.push_str(
        "- If several candidates fit, prefer the most specific match and \
         lower your confidence accordingly.",
    );

    let mut user = String::with_capacity(256 + candidates.len() * 48);
    let _ = writeln!(user, "Item: {item_name}");
    if let Some(category) = category {
        if !category.is_empty() {
            let _ = writeln!(user, "Source category hint: {category}");
        }
    }
    let _ = writeln!(user, "Choosing the {} (level {}).", level.name(), level.index());
    let _ = writeln!(user, "Candidates:");
    for node in candidates {
        let _ = writeln!(user, "{} — {}", node.code, node.name);
    }
    user.push_str(
        "\nRespond with exactly one JSON object and nothing else:\n\
         { \"selected_code\": \"<one of the listed codes>\", \
         \"confidence\": <0..1>, \"reasoning\": \"<short>\" }",
    );

    Prompt { system, user }
}

/// Instructional suffix appended when the first verdict at a level was
/// malformed and the call is retried.
pub const RETRY_SUFFIX: &str = "\n\nYour previous answer was not valid. Return ONLY the JSON \
     object in the exact shape requested, with selected_code copied \
     verbatim from the candidate list.";

#[cfg(test)]
mod tests {
    use super::*;
    use rubric_types::TaxonomyNode;

    fn node(code: &str, name: &str, level: Level) -> TaxonomyNode {
        TaxonomyNode {
            code: code.into(),
            name: name.into(),
            level,
            parent_code: None,
        }
    }

    #[test]
    fn lists_candidates_as_code_name_lines() {
        let a = node("26", "Компьютеры и электроника", Level::Class);
        let b = node("27", "Электрооборудование", Level::Class);
        let prompt = build(
            "датчик давления",
            None,
            Level::Class,
            &[&a, &b],
            ObjectType::Unknown,
        );

        assert!(prompt.user.contains("26 — Компьютеры и электроника"));
        assert!(prompt.user.contains("27 — Электрооборудование"));
        assert!(prompt.user.contains("Item: датчик давления"));
        assert!(prompt.user.contains("\"selected_code\""));
    }

    #[test]
    fn product_bias_forbids_service_codes() {
        let a = node("C", "Обрабатывающие производства", Level::Section);
        let prompt = build("кабель", None, Level::Section, &[&a], ObjectType::Product);
        assert!(prompt.system.contains("PHYSICAL GOOD"));

        let neutral = build("кабель", None, Level::Section, &[&a], ObjectType::Unknown);
        assert!(!neutral.system.contains("PHYSICAL GOOD"));
        assert!(!neutral.system.contains("SERVICE"));
    }

    #[test]
    fn category_hint_included_when_present() {
        let a = node("C", "Production", Level::Section);
        let with_hint = build(
            "кабель",
            Some("Материалы"),
            Level::Section,
            &[&a],
            ObjectType::Unknown,
        );
        assert!(with_hint.user.contains("Материалы"));

        let empty_hint = build("кабель", Some(""), Level::Section, &[&a], ObjectType::Unknown);
        assert!(!empty_hint.user.contains("hint"));
    }

    #[test]
    fn names_the_level() {
        let a = node("26.51", "Приборы измерительные", Level::Subclass);
        let prompt = build("манометр", None, Level::Subclass, &[&a], ObjectType::Unknown);
        assert!(prompt.user.contains("subclass"));
        assert!(prompt.user.contains("level 2"));
    }

    #[test]
    fn size_counts_both_messages() {
        let a = node("C", "X", Level::Section);
        let prompt = build("кабель", None, Level::Section, &[&a], ObjectType::Unknown);
        assert_eq!(
            prompt.size(),
            prompt.system.chars().count() + prompt.user.chars().count()
        );
        assert!(prompt.size() > 100);
    }
}
