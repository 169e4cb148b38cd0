use crate::config::Configuration;
use crate::errors::Result;
use regex::{NoExpand, Regex, RegexBuilder};
use std::borrow::Cow;

/// Decides whether a piece of text contains the search text and produces the
/// substituted text.
///
/// The search text is always literal. Case-insensitive and whole-word modes
/// escape it into a compiled `Regex`; plain case-sensitive mode uses `str`
/// substring operations directly. The replacement text is literal as well:
/// `$1` in a replacement is inserted verbatim.
#[derive(Debug, Clone)]
pub struct Matcher {
    search: String,
    replacement: String,
    pattern: Option<Regex>,
}

impl Matcher {
    /// Creates a new `Matcher`.
    ///
    /// Whole-word mode requires the occurrence to be preceded by a non-word
    /// character or the start of the text, and followed by a non-word
    /// character or the end of the text.
    pub fn new(
        search: &str,
        replacement: &str,
        case_sensitive: bool,
        whole_word: bool,
    ) -> Result<Self> {
        let pattern = if search.is_empty() || (case_sensitive && !whole_word) {
            None
        } else {
            let escaped = regex::escape(search);
            let source = if whole_word {
                format!(r"\b{{start-half}}{escaped}\b{{end-half}}")
            } else {
                escaped
            };
            Some(
                RegexBuilder::new(&source)
                    .case_insensitive(!case_sensitive)
                    .build()?,
            )
        };

        Ok(Self {
            search: search.to_string(),
            replacement: replacement.to_string(),
            pattern,
        })
    }

    /// Builds the matcher described by a run configuration.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Self::new(
            &config.search,
            &config.replacement,
            config.case_sensitive,
            config.whole_word,
        )
    }

    /// `true` when the search text is empty, which turns every run into a no-op.
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.search.is_empty() {
            return false;
        }
        match &self.pattern {
            Some(re) => re.is_match(text),
            None => text.contains(self.search.as_str()),
        }
    }

    /// Replaces every occurrence of the search text.
    ///
    /// Borrows the input when nothing matched.
    pub fn replace<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.search.is_empty() {
            return Cow::Borrowed(text);
        }
        match &self.pattern {
            Some(re) => re.replace_all(text, NoExpand(&self.replacement)),
            None if text.contains(self.search.as_str()) => {
                Cow::Owned(text.replace(self.search.as_str(), &self.replacement))
            }
            None => Cow::Borrowed(text),
        }
    }

    /// Number of occurrences `replace` would substitute.
    pub fn count(&self, text: &str) -> usize {
        if self.search.is_empty() {
            return 0;
        }
        match &self.pattern {
            Some(re) => re.find_iter(text).count(),
            None => text.matches(self.search.as_str()).count(),
        }
    }
}
