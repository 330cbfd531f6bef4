//! Recursive character text splitter.
//!
//! Text is split on the coarsest separator it contains; pieces that are
//! still larger than `chunk_size` are split again with the next separator.
//! Small pieces are then merged back into chunks of at most `chunk_size`
//! characters, each new chunk starting with up to `chunk_overlap`
//! characters carried over from the end of the previous one.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
        }
    }
}

pub struct RecursiveTextSplitter {
    config: SplitterConfig,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            config: SplitterConfig {
                chunk_size,
                chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
            },
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) <= self.config.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, &separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, &separator));
        }

        chunks
    }

    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > size && !window.is_empty() {
                push_chunk(&mut chunks, &window, separator);

                while total > overlap
                    || (total > 0 && total + len + sep_len_if(&window, sep_len) > size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + sep_len_if(&window, sep_len);
                }
            }

            total += len + sep_len_if(&window, sep_len);
            window.push_back(piece);
        }

        push_chunk(&mut chunks, &window, separator);
        chunks
    }
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (String, &'a [String]) {
    for (index, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator.as_str()) {
            return (separator.clone(), &separators[index + 1..]);
        }
    }
    (String::new(), &[])
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Separator cost of joining one more piece onto a non-empty window.
fn sep_len_if(window: &VecDeque<&str>, sep_len: usize) -> usize {
    if window.is_empty() {
        0
    } else {
        sep_len
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveTextSplitter {
        RecursiveTextSplitter::new(SplitterConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = splitter(512, 100).split_text("Max Verstappen won the 2023 title.");
        assert_eq!(chunks, vec!["Max Verstappen won the 2023 title."]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(splitter(512, 100).split_text("").is_empty());
        assert!(splitter(512, 100).split_text("   ").is_empty());
    }

    #[test]
    fn chunks_respect_size_and_carry_overlap() {
        let words: Vec<String> = (0..200).map(|i| format!("word{:03}", i)).collect();
        let text = words.join(" ");
        let chunks = splitter(80, 20).split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80, "oversized chunk: {}", chunk);
        }
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].contains(last_word),
                "expected overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }

        let first_word = chunks.first().unwrap().split(' ').next().unwrap();
        let final_word = chunks.last().unwrap().split(' ').last().unwrap();
        assert_eq!(first_word, "word000");
        assert_eq!(final_word, "word199");
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "Lewis Hamilton drives for Ferrari.\n\nCharles Leclerc is his teammate.";
        let chunks = splitter(40, 0).split_text(text);
        assert_eq!(
            chunks,
            vec![
                "Lewis Hamilton drives for Ferrari.",
                "Charles Leclerc is his teammate."
            ]
        );
    }

    #[test]
    fn long_unbroken_words_fall_back_to_characters() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 0).split_text(&text);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let s = splitter(10, 50);
        assert_eq!(s.config().chunk_overlap, 9);
    }
}
