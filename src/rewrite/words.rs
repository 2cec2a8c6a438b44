//! Word decoration.
//!
//! Appends a marker glyph (`™` by default) after every whole word of exactly
//! `word_length` word characters in visible text. Word characters and
//! boundaries are Unicode-aware, so Cyrillic words qualify the same way as
//! Latin ones.

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;

use crate::config::RewriteConfig;
use crate::rewrite::markup::walk;

/// Parents whose text is never rendered.
const NON_TEXT_PARENTS: &[&str] = &["style", "script", "head", "title"];

#[derive(Debug, Clone)]
pub struct WordDecorator {
    pattern: Regex,
    word_length: usize,
    marker: char,
    redecorate: bool,
}

impl WordDecorator {
    pub fn new(config: &RewriteConfig) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"\b\w{{{}}}\b", config.word_length))?;
        Ok(Self {
            pattern,
            word_length: config.word_length,
            marker: config.marker,
            redecorate: config.redecorate,
        })
    }

    /// Decorate one piece of text.
    ///
    /// Returns the new text and the number of decorated words, or `None`
    /// when nothing qualifies.
    pub fn decorate_text(&self, text: &str) -> Option<(String, usize)> {
        if text.trim().chars().count() < self.word_length {
            return None;
        }

        let mut out = String::with_capacity(text.len() + 16);
        let mut last = 0;
        let mut count = 0;
        for word in self.pattern.find_iter(text) {
            if !self.redecorate && text[word.end()..].starts_with(self.marker) {
                continue;
            }
            out.push_str(&text[last..word.end()]);
            out.push(self.marker);
            last = word.end();
            count += 1;
        }

        if count == 0 {
            return None;
        }
        out.push_str(&text[last..]);
        Some((out, count))
    }

    /// Decorate every visible text node under `document`.
    ///
    /// Returns `(text nodes changed, words decorated)`.
    pub fn apply(&self, document: &Handle) -> (usize, usize) {
        let mut nodes = 0;
        let mut words = 0;
        walk(document, |node, parent| {
            let NodeData::Text { contents } = &node.data else {
                return;
            };
            if !is_visible_parent(parent) {
                return;
            }
            let decorated = self.decorate_text(&contents.borrow());
            if let Some((text, count)) = decorated {
                *contents.borrow_mut() = text.as_str().into();
                nodes += 1;
                words += count;
            }
        });
        (nodes, words)
    }
}

fn is_visible_parent(parent: &Handle) -> bool {
    match &parent.data {
        NodeData::Document => false,
        NodeData::Element { name, .. } => !NON_TEXT_PARENTS.contains(&&*name.local),
        _ => true,
    }
}
