//! Line-oriented access to source text.
//!
//! The tokenizer consumes its input one line at a time. Every line keeps its
//! original, untrimmed text together with its 1-based line number, which lets
//! diagnostics quote the offending line exactly as the user wrote it.

use std::io::{self, BufRead};

/// A line of source text and its position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    number: u32,
    text: String,
}

impl Line {
    /// Builds a line from its number and text.
    pub fn new(number: u32, text: String) -> Self {
        Line { number, text }
    }

    /// 1-based line number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Raw text, without the line terminator.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Discards the number and takes ownership of the text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Numbered line iterator over a buffered reader.
///
/// Both `\n` and `\r\n` terminators are accepted. After the first I/O error
/// the iterator is fused and yields nothing else.
pub struct Lines<R> {
    inner: io::Lines<R>,
    number: u32,
    failed: bool,
}

/// Wraps a reader into a [`Lines`] iterator, starting at line 1.
pub fn lines<R: BufRead>(reader: R) -> Lines<R> {
    Lines {
        inner: reader.lines(),
        number: 0,
        failed: false,
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.inner.next()? {
            Ok(text) => {
                self.number += 1;
                Some(Ok(Line::new(self.number, text)))
            }

            Err(error) => {
                self.failed = true;
                Some(Err(error))
            }
        }
    }
}
