//! Synthetic input generation for exercising the pipeline.
//!
//! Lines consist of a 1-based line number followed by random lowercase words separated by
//! single spaces, so every line is distinct and every transform has something to change.

use rand::{Rng, RngExt};

/// Shape of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineShape {
    /// Random words per line, after the line number.
    pub words_per_line: usize,
    pub min_word_len: usize,
    pub max_word_len: usize,
}

impl Default for LineShape {
    fn default() -> Self {
        Self { words_per_line: 6, min_word_len: 1, max_word_len: 8 }
    }
}

impl LineShape {
    #[must_use]
    pub fn with_words_per_line(mut self, words: usize) -> Self {
        self.words_per_line = words;
        self
    }

    /// Generate one line numbered `number`.
    pub fn generate_line<R: Rng>(&self, number: usize, rng: &mut R) -> String {
        let mut line = number.to_string();
        let max_len = self.max_word_len.max(self.min_word_len);
        for _ in 0..self.words_per_line {
            line.push(' ');
            let len = rng.random_range(self.min_word_len..=max_len);
            line.extend((0..len).map(|_| char::from(b'a' + rng.random_range(0..26u8))));
        }
        line
    }

    /// Generate `count` lines numbered from 1.
    pub fn generate_lines<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<String> {
        (1..=count).map(|number| self.generate_line(number, rng)).collect()
    }
}
