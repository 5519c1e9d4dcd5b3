//! Fixed-size overlapping text chunking.

use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Chunk size and overlap, counted in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 20,
        }
    }
}

impl ChunkerConfig {
    /// Rejects configurations that would make [`split_text`] loop forever.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits `text` into chunks of up to `chunk_size` characters, each chunk
/// starting `chunk_size - overlap` characters after the previous one.
///
/// Offsets count characters and slices always fall on `char` boundaries.
/// Empty text yields no chunks; the final chunk may be shorter than
/// `chunk_size`. The chunk sequence covers the whole text with no gaps.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Result<Vec<String>, RagError> {
    config.validate()?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // boundaries[i] is the byte offset of the i-th character.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let chars = boundaries.len() - 1;

    let step = config.chunk_size - config.overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars {
        let end = (start + config.chunk_size).min(chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        start += step;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size,
            overlap,
        }
    }

    /// Chunk count according to the splitting loop itself.
    fn expected_count(len: usize, chunk_size: usize, overlap: usize) -> usize {
        let step = chunk_size - overlap;
        let mut count = 0;
        let mut start = 0;
        while start < len {
            count += 1;
            start += step;
        }
        count
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("hello", &config(1000, 20)).unwrap();
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = split_text("", &ChunkerConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn overlap_equal_to_chunk_size_fails_fast() {
        let err = split_text("some text", &config(100, 100)).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn overlap_larger_than_chunk_size_fails_fast() {
        let err = split_text("some text", &config(10, 50)).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn zero_chunk_size_fails_fast() {
        let err = split_text("some text", &config(0, 0)).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn fifteen_hundred_chars_make_two_chunks() {
        let text: String = (0..1500).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let chunks = split_text(&text, &config(1000, 20)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 520);
        // The second chunk starts 20 characters before the first one ends.
        assert_eq!(&chunks[0][980..], &chunks[1][..20]);
    }

    #[test]
    fn chunk_counts_and_lengths_match_the_reference_loop() {
        let cases = [
            (1, 1000, 20),
            (5, 1000, 20),
            (999, 1000, 20),
            (1000, 1000, 20),
            (1001, 1000, 20),
            (1500, 1000, 20),
            (1960, 1000, 20),
            (1961, 1000, 20),
            (5000, 1000, 20),
            (100, 10, 3),
            (100, 7, 0),
        ];

        for (len, chunk_size, overlap) in cases {
            let text: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
            let cfg = config(chunk_size, overlap);
            let chunks = split_text(&text, &cfg).unwrap();

            assert_eq!(
                chunks.len(),
                expected_count(len, chunk_size, overlap),
                "count for len={len} chunk_size={chunk_size} overlap={overlap}"
            );
            for chunk in &chunks {
                assert!(chunk.chars().count() <= chunk_size);
            }
        }
    }

    #[test]
    fn non_overlapping_suffixes_reconstruct_the_text() {
        let text: String = (0..2500).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let cfg = config(300, 40);
        let chunks = split_text(&text, &cfg).unwrap();

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let suffix: String = chunk.chars().skip(cfg.overlap).collect();
            rebuilt.push_str(&suffix);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text: String = "é".repeat(1500);
        let chunks = split_text(&text, &config(1000, 20)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 520);
    }
}
