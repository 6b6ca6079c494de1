//! Paged candidate picker drawn under the current line.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveToColumn, MoveUp, Show};
use crossterm::event::KeyEvent;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{Clear, ClearType};
use opsh_core::Candidate;
use tracing::debug;

use crate::error::{UiError, UiResult};
use crate::keymap::{self, KeyAction, KeyMapStack};
use crate::terminal::Terminal;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// How a pick ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Selected(Candidate),
    /// Escape, or nothing to pick from
    Cancelled,
    /// A key the picker does not handle; the host should process it
    Escaped(KeyEvent),
}

/// Candidate list with a highlighted row and a sliding window of `page_size`
/// rows.
///
/// The highlight always lies inside the visible window.
#[derive(Debug, Clone)]
pub struct CompletionPicker {
    candidates: Vec<Candidate>,
    page_size: usize,
    highlighted: usize,
    window_offset: usize,
    escaping: bool,
}

impl CompletionPicker {
    pub fn new(candidates: Vec<Candidate>, page_size: usize) -> Self {
        Self {
            candidates,
            page_size: page_size.max(1),
            highlighted: 0,
            window_offset: 0,
            escaping: false,
        }
    }

    /// Let Escape and unhandled keys close the picker.
    pub fn escaping(mut self, escaping: bool) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn window_offset(&self) -> usize {
        self.window_offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected(&self) -> Option<&Candidate> {
        self.candidates.get(self.highlighted)
    }

    /// Rows currently on screen.
    pub fn visible(&self) -> &[Candidate] {
        let end = (self.window_offset + self.page_size).min(self.candidates.len());
        &self.candidates[self.window_offset.min(end)..end]
    }

    pub fn next(&mut self) {
        if self.highlighted + 1 < self.candidates.len() {
            self.highlighted += 1;
        }
        self.scroll();
    }

    pub fn previous(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
        self.scroll();
    }

    pub fn first(&mut self) {
        self.highlighted = 0;
        self.scroll();
    }

    pub fn last(&mut self) {
        self.highlighted = self.candidates.len().saturating_sub(1);
        self.scroll();
    }

    pub fn page_forward(&mut self) {
        let last = self.candidates.len().saturating_sub(1);
        self.highlighted = (self.highlighted + self.page_size).min(last);
        self.scroll();
    }

    pub fn page_back(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(self.page_size);
        self.scroll();
    }

    /// Highlight row `row` of the visible page, if it exists.
    pub fn jump(&mut self, row: usize) {
        if row < self.visible().len() {
            self.highlighted = self.window_offset + row;
        }
    }

    /// Apply a navigation action. Returns false for anything else.
    pub fn apply(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Next => self.next(),
            KeyAction::Previous => self.previous(),
            KeyAction::First => self.first(),
            KeyAction::Last => self.last(),
            KeyAction::PageForward => self.page_forward(),
            KeyAction::PageBack => self.page_back(),
            KeyAction::Jump(row) => self.jump(row),
            _ => return false,
        }
        true
    }

    fn scroll(&mut self) {
        if self.highlighted < self.window_offset {
            self.window_offset = self.highlighted;
        } else if self.highlighted >= self.window_offset + self.page_size {
            self.window_offset = self.highlighted + 1 - self.page_size;
        }
    }

    /// Draw the visible rows below the cursor line and return to it.
    pub fn render<W: Write>(&self, out: &mut W, rows_drawn: usize) -> io::Result<usize> {
        let visible = self.visible();
        let value_width = visible.iter().map(|c| c.value.len()).max().unwrap_or(0);

        for (row, candidate) in visible.iter().enumerate() {
            let label = match &candidate.description {
                Some(description) => format!("{row} {:<value_width$}  {description}", candidate.value),
                None => format!("{row} {}", candidate.value),
            };
            queue!(out, Print("\r\n"), Clear(ClearType::UntilNewLine))?;
            if self.window_offset + row == self.highlighted {
                queue!(
                    out,
                    SetAttribute(Attribute::Reverse),
                    Print(label),
                    SetAttribute(Attribute::Reset)
                )?;
            } else {
                queue!(out, Print(label))?;
            }
        }
        // A shorter page than last time leaves stale rows below.
        for _ in visible.len()..rows_drawn {
            queue!(out, Print("\r\n"), Clear(ClearType::UntilNewLine))?;
        }

        let rows = visible.len().max(rows_drawn);
        if rows > 0 {
            queue!(out, MoveUp(crate::render::column_u16(rows)))?;
        }
        queue!(out, MoveToColumn(0))?;
        out.flush()?;
        Ok(rows)
    }

    /// Erase `rows` rows below the cursor line.
    pub fn clear<W: Write>(out: &mut W, rows: usize) -> io::Result<()> {
        for _ in 0..rows {
            queue!(out, Print("\r\n"), Clear(ClearType::UntilNewLine))?;
        }
        if rows > 0 {
            queue!(out, MoveUp(crate::render::column_u16(rows)))?;
        }
        queue!(out, Show)?;
        out.flush()
    }

    /// Run the picker until it closes.
    ///
    /// The caller owns raw mode; the picker only pushes its key map.
    pub async fn pick(&mut self, term: &Terminal, keymaps: &KeyMapStack) -> UiResult<PickerOutcome> {
        if self.candidates.is_empty() {
            return Ok(PickerOutcome::Cancelled);
        }
        let _frame = keymaps.enter(keymap::picker());
        term.with_out(|out| queue!(out, Hide))?;
        let mut rows = 0;

        let outcome = loop {
            rows = term.with_out(|out| self.render(out, rows))?;
            let key = term.read_key().await;
            let key = match key {
                Ok(key) => key,
                Err(e) => {
                    term.with_out(|out| Self::clear(out, rows))?;
                    return Err(e);
                }
            };

            match keymaps.dispatch(&key) {
                Some(KeyAction::Interrupt) => {
                    term.with_out(|out| Self::clear(out, rows))?;
                    return Err(UiError::Interrupted);
                }
                Some(KeyAction::Submit) => {
                    break match self.selected() {
                        Some(candidate) => PickerOutcome::Selected(candidate.clone()),
                        None => PickerOutcome::Cancelled,
                    };
                }
                Some(KeyAction::Cancel) if self.escaping => break PickerOutcome::Cancelled,
                Some(action) if self.apply(action) => {}
                _ if self.escaping => break PickerOutcome::Escaped(key),
                _ => {}
            }
        };

        debug!(?outcome, "picker closed");
        term.with_out(|out| Self::clear(out, rows))?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picker(n: usize, page: usize) -> CompletionPicker {
        let candidates = (0..n).map(|i| Candidate::new(format!("c{i:02}"))).collect();
        CompletionPicker::new(candidates, page)
    }

    fn in_window(p: &CompletionPicker) -> bool {
        let visible = p.page_size().min(p.len());
        p.highlighted() >= p.window_offset() && p.highlighted() < p.window_offset() + visible
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut p = picker(3, 10);
        p.previous();
        assert_eq!(p.highlighted(), 0);
        p.next();
        p.next();
        p.next();
        assert_eq!(p.highlighted(), 2);
    }

    #[test]
    fn test_window_follows_highlight() {
        let mut p = picker(25, 10);
        for _ in 0..12 {
            p.next();
        }
        assert_eq!(p.highlighted(), 12);
        assert_eq!(p.window_offset(), 3);
        p.page_forward();
        assert_eq!(p.highlighted(), 22);
        assert_eq!(p.window_offset(), 13);
        p.page_forward();
        assert_eq!(p.highlighted(), 24);
        assert_eq!(p.visible().len(), 10);
        p.first();
        assert_eq!((p.highlighted(), p.window_offset()), (0, 0));
        p.last();
        assert_eq!((p.highlighted(), p.window_offset()), (24, 15));
        p.page_back();
        assert_eq!((p.highlighted(), p.window_offset()), (14, 14));
    }

    #[test]
    fn test_digit_jumps_within_visible_page() {
        let mut p = picker(25, 10);
        p.page_forward();
        p.page_forward();
        assert_eq!(p.window_offset(), 11);
        p.jump(4);
        assert_eq!(p.highlighted(), 15);

        let mut short = picker(3, 10);
        short.jump(7);
        assert_eq!(short.highlighted(), 0);
    }

    #[test]
    fn test_highlight_stays_in_window_for_any_sequence() {
        let actions = [
            KeyAction::Next,
            KeyAction::PageForward,
            KeyAction::Jump(9),
            KeyAction::Previous,
            KeyAction::PageBack,
            KeyAction::Last,
            KeyAction::Jump(0),
            KeyAction::First,
        ];
        for n in [1, 4, 10, 11, 37] {
            for page in [1, 3, 10] {
                let mut p = picker(n, page);
                for step in 0..200 {
                    p.apply(actions[(step * 7 + n) % actions.len()]);
                    assert!(in_window(&p), "n={n} page={page} step={step}");
                }
            }
        }
    }

    #[test]
    fn test_render_returns_to_line() {
        let mut out = Vec::new();
        let p = picker(3, 10);
        let rows = p.render(&mut out, 0).unwrap();
        assert_eq!(rows, 3);
        let screen = String::from_utf8(out).unwrap();
        assert!(screen.contains("0 c00"));
        assert!(screen.contains("2 c02"));
        assert!(screen.contains("\u{1b}[3A"));
    }
}
