use crate::error::{Error, Result};

const TRAILING_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\'',
];

/// Trims whitespace and rejects empty strings.
pub fn validate_non_empty(input: &str) -> Result<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl);
    }
    Ok(trimmed)
}

/// Strip punctuation that chat users put around links.
pub fn trim_link_punctuation(candidate: &str) -> &str {
    candidate
        .trim_start_matches(['(', '[', '{', '<', '"', '\''])
        .trim_end_matches(TRAILING_PUNCTUATION)
}
