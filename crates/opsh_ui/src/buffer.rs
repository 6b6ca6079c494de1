//! Editable line state: text, cursor and auto-suggestion.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Active,
    Complete,
}

/// Text being edited. The cursor is a character index, not a byte offset.
///
/// Once [`complete`](LineBuffer::complete) is called every mutation is a
/// no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
    status: Status,
    suggestion: Option<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self {
            cursor: chars.len(),
            chars,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn text_before_cursor(&self) -> String {
        self.chars[..self.cursor].iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn insert(&mut self, c: char) {
        if self.is_complete() {
            return;
        }
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert(c);
        }
    }

    pub fn delete_left(&mut self) {
        if self.is_complete() || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
    }

    pub fn delete_right(&mut self) {
        if self.is_complete() || self.cursor >= self.chars.len() {
            return;
        }
        self.chars.remove(self.cursor);
    }

    pub fn delete_word_left(&mut self) {
        if self.is_complete() {
            return;
        }
        let start = self.word_start();
        self.chars.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn delete_word_right(&mut self) {
        if self.is_complete() {
            return;
        }
        let end = self.word_end();
        self.chars.drain(self.cursor..end);
    }

    pub fn move_left(&mut self) {
        if self.is_complete() {
            return;
        }
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move right, or accept the suggestion when already at the end.
    pub fn move_right(&mut self) {
        if self.is_complete() {
            return;
        }
        if self.cursor < self.chars.len() {
            self.cursor += 1;
        } else {
            self.accept_suggestion();
        }
    }

    pub fn move_word_left(&mut self) {
        if self.is_complete() {
            return;
        }
        self.cursor = self.word_start();
    }

    pub fn move_word_right(&mut self) {
        if self.is_complete() {
            return;
        }
        self.cursor = self.word_end();
    }

    pub fn move_home(&mut self) {
        if self.is_complete() {
            return;
        }
        self.cursor = 0;
    }

    /// Move to the end, accepting the suggestion if there is one.
    pub fn move_end(&mut self) {
        if self.is_complete() {
            return;
        }
        if self.cursor == self.chars.len() {
            self.accept_suggestion();
        }
        self.cursor = self.chars.len();
    }

    /// Replace the whole text, cursor at the end.
    pub fn replace(&mut self, text: &str) {
        if self.is_complete() {
            return;
        }
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }

    /// Replace the character range `range` with `text`, cursor after it.
    pub fn splice(&mut self, range: Range<usize>, text: &str) {
        if self.is_complete() {
            return;
        }
        let end = range.end.min(self.chars.len());
        let start = range.start.min(end);
        let inserted: Vec<char> = text.chars().collect();
        self.cursor = start + inserted.len();
        self.chars.splice(start..end, inserted);
    }

    pub fn set_suggestion(&mut self, suggestion: Option<String>) {
        if self.is_complete() {
            return;
        }
        self.suggestion = suggestion.filter(|s| !s.is_empty() && !s.contains('\n'));
    }

    pub fn complete(&mut self) {
        self.suggestion = None;
        self.status = Status::Complete;
    }

    fn accept_suggestion(&mut self) {
        if let Some(suggestion) = self.suggestion.take() {
            self.chars.extend(suggestion.chars());
            self.cursor = self.chars.len();
        }
    }

    /// Start of the word left of the cursor, skipping spaces first.
    fn word_start(&self) -> usize {
        let mut i = self.cursor;
        while i > 0 && self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        i
    }

    /// End of the word right of the cursor, skipping spaces first.
    fn word_end(&self) -> usize {
        let len = self.chars.len();
        let mut i = self.cursor;
        while i < len && self.chars[i].is_whitespace() {
            i += 1;
        }
        while i < len && !self.chars[i].is_whitespace() {
            i += 1;
        }
        i
    }
}
