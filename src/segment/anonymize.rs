//! Word-count preserving text replacement.

use regex::Regex;
use std::sync::LazyLock;

/// Anything that is not a Unicode letter, number or whitespace.
static SYMBOLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("SYMBOLS: hardcoded regex is valid"));

/// Filler vocabulary, used cyclically.
pub const FILLER_WORDS: [&str; 19] = [
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];

/// Token used for runs of at most two words.
pub const SHORT_TEXT: &str = "Text";

/// `n` filler words joined by single spaces.
pub fn filler(n: usize) -> String {
    FILLER_WORDS
        .iter()
        .cycle()
        .take(n)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop everything that is not a letter, number or whitespace.
fn strip_symbols(text: &str) -> String {
    SYMBOLS.replace_all(text, "").into_owned()
}

/// Replacement for the data of one text node.
///
/// Returns `None` for whitespace-only input, which is left untouched. Text
/// with nothing left after symbol stripping becomes empty; otherwise the
/// result is `"Text "` for one or two words, or as many filler words as the
/// input had, each followed by a trailing space.
pub fn anonymize_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let cleaned = strip_symbols(raw);
    let words = cleaned.split_whitespace().count();
    Some(match words {
        0 => String::new(),
        1 | 2 => format!("{} ", SHORT_TEXT),
        n => format!("{} ", filler(n)),
    })
}
