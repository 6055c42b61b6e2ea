//! # Line Breaking
//!
//! Greedy word wrapping against a caller-supplied measure. Words are split on
//! whitespace and appended to the current line while the measured line still
//! fits; the next word that would overflow starts a new line. A word wider
//! than the column gets a line of its own and is never truncated.
//!
//! The wrapper is an iterator: lines are produced lazily and the sequence is
//! consumed once per block.

use std::str::{Lines, SplitWhitespace};

/// Wrap `text` to `max_width`, measuring candidate lines with `measure`.
///
/// Hard newlines always start a new line, and a blank line in the input
/// yields an empty line. Empty text yields nothing.
pub fn wrap<M>(text: &str, max_width: f64, measure: M) -> WrapLines<'_, M>
where
    M: Fn(&str) -> f64,
{
    WrapLines {
        paragraphs: text.lines(),
        words: None,
        carry: None,
        max_width,
        measure,
    }
}

/// Iterator returned by [`wrap`].
pub struct WrapLines<'a, M> {
    paragraphs: Lines<'a>,
    words: Option<SplitWhitespace<'a>>,
    /// A word that overflowed the previous line and opens the next one.
    carry: Option<&'a str>,
    max_width: f64,
    measure: M,
}

impl<'a, M> Iterator for WrapLines<'a, M>
where
    M: Fn(&str) -> f64,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.words.is_none() {
            self.words = Some(self.paragraphs.next()?.split_whitespace());
        }

        let mut line = String::new();
        loop {
            let word = match self.carry.take() {
                Some(word) => word,
                None => match self.words.as_mut().and_then(|w| w.next()) {
                    Some(word) => word,
                    None => {
                        self.words = None;
                        return Some(line);
                    }
                },
            };

            if line.is_empty() {
                line.push_str(word);
                continue;
            }

            let candidate = format!("{line} {word}");
            if (self.measure)(&candidate) <= self.max_width {
                line = candidate;
            } else {
                self.carry = Some(word);
                return Some(line);
            }
        }
    }
}
