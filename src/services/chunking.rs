use regex::Regex;
use std::sync::LazyLock;

/// Sentence terminator followed by whitespace.
static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("Invalid sentence regex"));

/// Blank line between paragraphs.
static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph regex"));

/// Splits long text into overlapping chunks.
///
/// Sizes are counted in characters. A chunk that is not the last one ends
/// after the last sentence terminator inside its trailing overlap window,
/// else at the last paragraph break there, else at the hard size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Chunker {
    pub const fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        // Byte offset of every char index, plus one past the end.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        if total <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let mut end = start + self.chunk_size;
            if end < total {
                let search_start = start.max(end.saturating_sub(self.overlap));
                let boundary = find_boundary(text, &offsets, search_start, end);
                if boundary > start {
                    end = boundary;
                }
            }

            let chunk = text[offsets[start]..offsets[end.min(total)]].trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            start = (start + 1).max(end.saturating_sub(self.overlap));
        }
        chunks
    }
}

/// Char index of the best break in `[start, end)`, or `end` when none.
fn find_boundary(text: &str, offsets: &[usize], start: usize, end: usize) -> usize {
    let window = &text[offsets[start]..offsets[end]];
    let to_char_index = |byte: usize| start + window[..byte].chars().count();

    if let Some(m) = SENTENCE_END_RE.find_iter(window).last() {
        return to_char_index(m.end());
    }
    if let Some(m) = PARAGRAPH_BREAK_RE.find_iter(window).last() {
        return to_char_index(m.start());
    }
    end
}
