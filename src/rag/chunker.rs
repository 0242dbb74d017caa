//! Overlapping text chunker.
//!
//! Splits text into windows of at most `chunk_size` characters. A window
//! that would cut a sentence is pulled back to just after the last `.` in
//! it, as long as that keeps more than half the window. Consecutive windows
//! overlap by `overlap` characters, so no part of the input is skipped.

use std::ops::Range;

use crate::rag::error::{RagError, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextChunker {
    /// Create a chunker. `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    ///
    /// Text no longer than `chunk_size` comes back unchanged as one chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        self.windows(&chars)
            .into_iter()
            .filter_map(|range| {
                let window: String = chars[range].iter().collect();
                let trimmed = window.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    /// Character ranges of the windows `chunk` would cut from `text`.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![0..chars.len()];
        }
        self.windows(&chars)
    }

    fn windows(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        let mut windows = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = (start + self.chunk_size).min(len);

            if end < len {
                let sentence_end = chars[start..end].iter().rposition(|&c| c == '.');
                if let Some(offset) = sentence_end {
                    if offset > self.chunk_size / 2 {
                        end = start + offset + 1;
                    }
                }
            }

            windows.push(start..end);
            if end >= len {
                break;
            }
            start = (end - self.overlap).max(start + 1);
        }
        windows
    }
}
