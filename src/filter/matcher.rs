use regex::Regex;

/// Characters that delimit a word, besides the ends of the string.
const BOUNDARY_CLASS: &str = r"[ \-,./]";

/// Case-insensitive whole-word matcher for one query. The query is
/// escaped before being embedded, so metacharacters in user input
/// (`C++`, `Node.js`) match literally and cannot alter the pattern.
pub struct WordMatcher {
    pattern: Regex,
}

impl WordMatcher {
    pub fn new(query: &str) -> WordMatcher {
        let escaped = regex::escape(query.trim());
        let source = format!("(?i)(^|{BOUNDARY_CLASS}){escaped}($|{BOUNDARY_CLASS})");
        WordMatcher {
            // escape() keeps the embedded query literal, so the pattern
            // always parses
            pattern: Regex::new(&source).expect("escaped word pattern is valid"),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
