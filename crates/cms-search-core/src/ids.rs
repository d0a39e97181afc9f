//! Identifier normalization.
//!
//! Indexed and queried forms of group identifiers and search words must agree,
//! so both the indexers and the query builder go through these helpers.

/// Normalize a group identifier.
///
/// Trims surrounding whitespace and lowercases. Group identifiers are compared
/// case-insensitively everywhere in the engine.
///
/// # Examples
///
/// ```
/// use cms_search_core::ids::normalize_group;
///
/// assert_eq!(normalize_group("Free"), "free");
/// assert_eq!(normalize_group("  ADMINISTRATORS "), "administrators");
/// ```
pub fn normalize_group(group: &str) -> String {
    group.trim().to_lowercase()
}

/// Split a raw query value into normalized search words.
///
/// Words are separated by any run of whitespace and lowercased. A value made
/// only of whitespace yields no words.
///
/// # Examples
///
/// ```
/// use cms_search_core::ids::split_words;
///
/// assert_eq!(split_words("Venice  Amsterdam"), vec!["venice", "amsterdam"]);
/// assert!(split_words("   ").is_empty());
/// ```
pub fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_group_lowercases() {
        assert_eq!(normalize_group("Editors"), "editors");
    }

    #[test]
    fn test_normalize_group_is_idempotent() {
        let once = normalize_group(" Free ");
        assert_eq!(normalize_group(&once), once);
    }

    #[test]
    fn test_split_words_collapses_whitespace() {
        assert_eq!(split_words("a\tb\n  c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_words_empty() {
        assert!(split_words("").is_empty());
    }

    #[test]
    fn test_split_words_unicode_lowercase() {
        assert_eq!(split_words("ÉTÉ Città"), vec!["été", "città"]);
    }
}
