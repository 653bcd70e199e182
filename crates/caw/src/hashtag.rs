//! Hashtag extraction from post text.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("#([0-9A-Za-z]+)").expect("hashtag pattern"))
}

/// Unique hashtags in `text`, in order of first appearance. A hashtag is
/// one or more alphanumeric characters following `#`.
pub fn extract(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for caps in pattern().captures_iter(text) {
        let tag = &caps[1];
        if seen.insert(tag.to_string()) {
            tags.push(tag.to_string());
        }
    }
    tags
}
