/// Longest keyword accepted, in characters
pub const MAX_KEYWORD_CHARS: usize = 100;

/// Trim a raw keyword and cap its length. Blank input yields `None`.
pub fn preprocess_keyword(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_KEYWORD_CHARS).collect())
}
