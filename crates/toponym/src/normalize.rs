//! Name normalization shared by the index builder and the resolver.
//!
//! Both sides must agree exactly: a name indexed as `sao paulo` is only found again
//! if the query `São Paulo` normalizes to the same tokens.
use std::fmt;

use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("token separator pattern is valid"));

/// A name reduced to lowercase ASCII alphanumeric tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedName {
    tokens: Vec<String>,
}

impl NormalizedName {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tokens joined by single spaces; the key of the exact-phrase lookup.
    pub fn phrase(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phrase())
    }
}

/// Transliterate to ASCII, lowercase, and split on every run of non-alphanumerics.
///
/// Empty, whitespace-only and punctuation-only input yields an empty name.
pub fn normalize(raw: &str) -> NormalizedName {
    let folded = deunicode(raw).to_lowercase();
    let tokens = NON_ALPHANUMERIC
        .split(&folded)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect();
    NormalizedName { tokens }
}
