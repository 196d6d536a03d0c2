use unicode_normalization::UnicodeNormalization;

/// Fold a string for outcome comparison: NFC normalization then lowercasing.
pub fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Locate `needle` inside `haystack` after folding both. The needle is
/// trimmed of surrounding whitespace; the haystack is not. Returns the byte
/// offset of the match within the folded haystack.
pub fn find_normalized(haystack: &str, needle: &str) -> Option<usize> {
    let h = normalize(haystack);
    let n = normalize(needle.trim());
    if n.is_empty() {
        return Some(0);
    }
    h.find(&n)
}

/// Length in bytes of the folded form of `needle` (trimmed), for snippet
/// extraction against the folded haystack.
pub fn normalized_len(needle: &str) -> usize {
    normalize(needle.trim()).len()
}

/// Extract up to 30 characters of context either side of a match in `text`.
/// `idx` and `match_len` are byte offsets into `text` and must lie on char
/// boundaries (as returned by `find_normalized` against the folded text).
pub fn snippet_around(text: &str, idx: usize, match_len: usize) -> String {
    let start = text[..idx]
        .char_indices()
        .rev()
        .nth(29)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let match_end = (idx + match_len).min(text.len());
    let end = text[match_end..]
        .char_indices()
        .nth(30)
        .map(|(i, _)| match_end + i)
        .unwrap_or(text.len());
    text[start..end].to_string()
}

/// Truncate a string to a maximum number of characters.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "..."
    }
}
