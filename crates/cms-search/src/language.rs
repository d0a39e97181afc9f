//! Language lookup collaborator.
//!
//! The application's language service decides which language codes get a
//! text field. The engine only reads the list.

/// Source of the configured language codes.
pub trait LanguageSource: Send + Sync {
    /// Language codes in use, e.g. `["en", "it"]`.
    fn language_codes(&self) -> Vec<String>;
}

/// A fixed list of language codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticLanguages(Vec<String>);

impl StaticLanguages {
    /// Wrap a list of codes; duplicates are dropped, order is kept.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.into();
            if !out.contains(&code) {
                out.push(code);
            }
        }
        Self(out)
    }
}

impl LanguageSource for StaticLanguages {
    fn language_codes(&self) -> Vec<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_languages_dedup() {
        let langs = StaticLanguages::new(["en", "it", "en"]);
        assert_eq!(langs.language_codes(), vec!["en", "it"]);
    }
}
