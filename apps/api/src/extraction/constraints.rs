use std::sync::LazyLock;

use regex::Regex;

/// Absolute-constraint language: exclusivity, hard requirements, location
/// commitment and deal-breakers.
const HARD_CONSTRAINT_PHRASES: &[&str] = &[
    "only",
    "just",
    "exclusively",
    "nothing else",
    "no other",
    "solely",
    "must",
    "need to",
    "have to",
    "required",
    "mandatory",
    "essential",
    "minimum",
    "at least",
    "relocating",
    "moving to",
    "willing to relocate",
    "won't consider",
    "definitely not",
    "never",
    "not interested in",
    "refuse to",
];

static HARD_CONSTRAINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = HARD_CONSTRAINT_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("hard constraint pattern is valid")
});

/// True when `text` states something the user will not compromise on.
pub fn detects_hard_constraint(text: &str) -> bool {
    HARD_CONSTRAINT_RE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusivity_detected() {
        assert!(detects_hard_constraint("I ONLY want remote work"));
        assert!(detects_hard_constraint("exclusively fintech"));
    }

    #[test]
    fn test_requirements_detected() {
        assert!(detects_hard_constraint("It must be in London"));
        assert!(detects_hard_constraint("minimum £1000 a day"));
        assert!(detects_hard_constraint("at least three days"));
    }

    #[test]
    fn test_deal_breakers_detected() {
        assert!(detects_hard_constraint("I won't consider agencies"));
        assert!(detects_hard_constraint("Not interested in travel"));
    }

    #[test]
    fn test_plain_statement_not_flagged() {
        assert!(!detects_hard_constraint("I'd like a CFO role in London"));
    }

    #[test]
    fn test_word_boundaries_respected() {
        assert!(!detects_hard_constraint("I like mustard"));
        assert!(!detects_hard_constraint("a neverending story"));
    }
}
