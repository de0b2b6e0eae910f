//! Recursive character text splitting.
//!
//! Splits on the coarsest separator present (blank line, newline, sentence,
//! word), merges neighbouring pieces up to `chunk_size` bytes and carries a
//! tail of at most `chunk_overlap` bytes into the next chunk. Pieces that are
//! still too large are split again with the next finer separator, and as a
//! last resort by characters.

use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// A chunk of a larger document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
}

/// Recursive chunker that respects document structure.
pub struct RecursiveChunker {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: vec!["\n\n", "\n", ". ", " "],
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        self.split_text(text, &self.separators)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| TextChunk { text, chunk_index })
            .collect()
    }

    fn split_text(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(pos) = separators.iter().position(|s| text.contains(s)) else {
            return self.split_chars(text);
        };
        let separator = separators[pos];
        let finer = &separators[pos + 1..];

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();

        for piece in text.split(separator).map(str::trim).filter(|p| !p.is_empty()) {
            if piece.len() > self.chunk_size {
                if !window.is_empty() {
                    chunks.push(join(&window, separator));
                    window.clear();
                }
                chunks.extend(self.split_text(piece, finer));
                continue;
            }

            if !window.is_empty()
                && joined_len(&window, separator) + separator.len() + piece.len() > self.chunk_size
            {
                chunks.push(join(&window, separator));
                // Keep an overlapping tail that still leaves room for `piece`
                while !window.is_empty() {
                    let len = joined_len(&window, separator);
                    if len <= self.chunk_overlap
                        && len + separator.len() + piece.len() <= self.chunk_size
                    {
                        break;
                    }
                    window.pop_front();
                }
            }

            window.push_back(piece);
        }

        if !window.is_empty() {
            chunks.push(join(&window, separator));
        }

        chunks
    }

    fn split_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

fn joined_len(parts: &VecDeque<&str>, separator: &str) -> usize {
    let text: usize = parts.iter().map(|p| p.len()).sum();
    text + separator.len() * parts.len().saturating_sub(1)
}

fn join(parts: &VecDeque<&str>, separator: &str) -> String {
    parts.iter().copied().collect::<Vec<_>>().join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = RecursiveChunker::default();
        let chunks = chunker.chunk("  Base pay is computed monthly.  ");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Base pay is computed monthly.");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let chunker = RecursiveChunker::default();
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn test_paragraphs_respect_size() {
        let chunker = RecursiveChunker::new(60, 0);
        let text = "Gross pay includes basic and allowances.\n\n\
                    PF is deducted at twelve percent.\n\n\
                    Bonus is paid annually in March.\n\n\
                    Net pay is gross minus deductions.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 60, "chunk too long: {:?}", chunk.text);
        }
        assert!(chunks[0].text.starts_with("Gross pay"));
        assert!(chunks.last().unwrap().text.ends_with("deductions."));
    }

    #[test]
    fn test_overlap_carries_tail() {
        let chunker = RecursiveChunker::new(20, 8);
        let text = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunker.chunk(&text);
        assert!(chunks.len() > 2);

        let first_last_word = chunks[0].text.split(' ').last().unwrap();
        let second_words: Vec<&str> = chunks[1].text.split(' ').collect();
        assert!(second_words.contains(&first_last_word));
        for chunk in &chunks {
            assert!(chunk.text.len() <= 20);
        }
    }

    #[test]
    fn test_unbroken_text_split_by_chars() {
        let chunker = RecursiveChunker::new(10, 2);
        let chunks = chunker.chunk(&"x".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
    }
}
