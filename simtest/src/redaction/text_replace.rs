use super::TextRedaction;
use regex::Regex;

/// Plain substring replacement. Every occurrence is rewritten, including ones
/// that only happen to be embedded in a longer token.
#[derive(Debug)]
pub struct LiteralReplace {
    text: String,
    substitution: String,
}

impl LiteralReplace {
    /// Returns `None` for an empty needle, which would otherwise match between
    /// every character.
    pub fn new<S1: Into<String>, S2: Into<String>>(text: S1, substitution: S2) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }

        Some(LiteralReplace {
            text,
            substitution: substitution.into(),
        })
    }
}

impl TextRedaction for LiteralReplace {
    fn redact(&self, text: &mut String) {
        if text.contains(&self.text) {
            *text = text.replace(&self.text, &self.substitution);
        }
    }
}

#[derive(Debug)]
pub struct RegexReplace {
    pattern: &'static Regex,
    substitution: &'static str,
}

impl RegexReplace {
    pub fn new(pattern: &'static Regex, substitution: &'static str) -> Self {
        RegexReplace {
            pattern,
            substitution,
        }
    }
}

impl TextRedaction for RegexReplace {
    fn redact(&self, text: &mut String) {
        if self.pattern.is_match(text) {
            *text = self
                .pattern
                .replace_all(text, self.substitution)
                .into_owned();
        }
    }
}
