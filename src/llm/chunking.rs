use crate::error::{RecapError, Result};

pub const DEFAULT_CHUNK_CHARS: usize = 12000;

/// Split `text` into consecutive slices of at most `char_limit` characters.
///
/// Boundaries fall on `char` boundaries and ignore words and sentences.
/// Concatenating the result yields `text` again; empty input yields no chunks.
pub fn chunk_transcript(text: &str, char_limit: usize) -> Result<Vec<&str>> {
    if char_limit == 0 {
        return Err(RecapError::InvalidInput(
            "chunk limit must be positive".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars_in_chunk = 0;

    for (idx, _) in text.char_indices() {
        if chars_in_chunk == char_limit {
            chunks.push(&text[start..idx]);
            start = idx;
            chars_in_chunk = 0;
        }
        chars_in_chunk += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    Ok(chunks)
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn needs_chunking(text: &str, char_limit: usize) -> bool {
    char_len(text) > char_limit
}
