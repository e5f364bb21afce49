//! Fixed-size character windows with overlap.
//!
//! Boundaries are counted in characters (Unicode scalar values), so words may
//! be split mid-way but a code point never is.

use crate::error::{Error, Result};

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// The text is trimmed first. Text that fits in a single window comes back as
/// one chunk, even when empty. Otherwise each window starts `chunk_size - overlap`
/// characters after the previous one and the last window may run short. Once a
/// window reaches the end of the text no further windows are produced.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    if overlap >= chunk_size {
        return Err(Error::Configuration(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        )));
    }

    let text = text.trim();

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    if char_len <= chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::with_capacity((char_len - chunk_size).div_ceil(step) + 1);
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(char_len);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_len {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
