//! Character-based document chunking for ingestion

/// Split `text` into chunks of at most `chunk_size` characters with
/// `overlap` characters shared between adjacent chunks.
///
/// Counts are in characters, not bytes, so multi-byte text never splits
/// inside a code point. Whitespace-only chunks are dropped.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("hello world", 100, 20);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn chunks_overlap_by_the_configured_amount() {
        let text = "abcdefghij";
        let chunks = split_text(text, 4, 2);

        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[1], "cdef");
        assert_eq!(chunks[2], "efgh");
        // Every adjacent pair shares its two-character seam.
        for pair in chunks.windows(2) {
            assert_eq!(&pair[0][2..], &pair[1][..2]);
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "日本語のテキストを分割する";
        let chunks = split_text(text, 5, 1);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].chars().count(), 5);
    }

    #[test]
    fn empty_and_blank_input_produce_no_chunks() {
        assert!(split_text("", 10, 2).is_empty());
        assert!(split_text("   \n\t  ", 10, 2).is_empty());
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "the quick brown fox jumps over the lazy dog".repeat(40);
        assert_eq!(split_text(&text, 1000, 200), split_text(&text, 1000, 200));
    }
}
