use crate::models::preference::PreferenceType;

/// Canonical spelling for a preference value.
///
/// Roles are upper-cased (`cfo` → `CFO`), locations are title-cased word by
/// word (`new YORK` → `New York`), everything else is only trimmed. Inner
/// whitespace is collapsed for every type. Returns `None` for blank input.
pub fn normalize_value(preference_type: PreferenceType, value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    let normalized = match preference_type {
        PreferenceType::Role => collapsed.to_uppercase(),
        PreferenceType::Location => collapsed
            .split(' ')
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join(" "),
        _ => collapsed,
    };
    Some(normalized)
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}
