//! FTS5 query construction.
//!
//! User text never reaches the MATCH expression verbatim: it is split into
//! word tokens and every token is emitted as a quoted FTS5 string, so
//! operators (`AND`, `NEAR`, `-`, `^`, column filters, ...) typed by a user
//! are searched for literally instead of being interpreted.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"));

/// A MATCH expression built from user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Expression to bind to `MATCH ?`.
    pub expression: String,
    /// Lowercased final token, used as the suggestion prefix.
    pub last_token: String,
}

/// Build a MATCH expression requiring every token, the last one as a prefix.
///
/// Returns `None` when the text holds no searchable tokens.
pub fn build_match_query(text: &str) -> Option<MatchQuery> {
    let tokens: Vec<String> =
        TOKEN_RE.find_iter(text).map(|m| m.as_str().to_lowercase()).collect();

    let (last, rest) = tokens.split_last()?;

    let mut parts: Vec<String> = rest.iter().map(|t| quote_term(t)).collect();
    parts.push(format!("{}*", quote_term(last)));

    Some(MatchQuery { expression: parts.join(" "), last_token: last.clone() })
}

/// Quote a term as an FTS5 string literal.
pub fn quote_term(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Exclusive upper bound for a prefix range scan over terms.
pub(crate) fn prefix_upper_bound(prefix: &str) -> String {
    let mut upper = prefix.to_string();
    upper.push(char::MAX);
    upper
}

/// Completion suggestions returned alongside search results.
///
/// A finite sequence that can be consumed once.
#[derive(Debug, Default)]
pub struct Suggestions {
    inner: std::vec::IntoIter<String>,
}

impl Suggestions {
    pub(crate) fn new(terms: Vec<String>) -> Self {
        Self { inner: terms.into_iter() }
    }

    /// No suggestions.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Iterator for Suggestions {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Suggestions {}
