//! Line editor: a header, a [`LineBuffer`] and the redraw after every change.

use std::io;
use std::time::Duration;

use crate::buffer::LineBuffer;
use crate::keymap::KeyAction;
use crate::render;
use crate::terminal::Terminal;

#[derive(Debug, Clone)]
pub struct LineEditor {
    header: String,
    buffer: LineBuffer,
    mask: Option<char>,
}

impl LineEditor {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            buffer: LineBuffer::new(),
            mask: None,
        }
    }

    /// Render every character as `glyph`. The buffer still holds plain text.
    pub fn masked(mut self, glyph: char) -> Self {
        self.mask = Some(glyph);
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }

    /// Apply an editing action. Returns false for actions that are not edits.
    pub fn apply(&mut self, action: KeyAction) -> bool {
        let buf = &mut self.buffer;
        match action {
            KeyAction::Insert(c) => buf.insert(c),
            KeyAction::DeleteLeft => buf.delete_left(),
            KeyAction::DeleteRight => buf.delete_right(),
            KeyAction::DeleteWordLeft => buf.delete_word_left(),
            KeyAction::DeleteWordRight => buf.delete_word_right(),
            KeyAction::MoveLeft => buf.move_left(),
            KeyAction::MoveRight => buf.move_right(),
            KeyAction::MoveWordLeft => buf.move_word_left(),
            KeyAction::MoveWordRight => buf.move_word_right(),
            KeyAction::MoveHome => buf.move_home(),
            KeyAction::MoveEnd => buf.move_end(),
            _ => return false,
        }
        true
    }

    pub fn render(&self, term: &Terminal) -> io::Result<()> {
        term.with_out(|out| render::render_line(out, &self.header, &self.buffer, self.mask))
    }

    pub fn render_busy(&self, term: &Terminal) -> io::Result<()> {
        term.with_out(|out| render::render_busy(out, &self.header, &self.buffer, self.mask))
    }

    /// Show an error below the line and redraw it.
    pub fn show_error(&self, term: &Terminal, message: &str) -> io::Result<()> {
        term.with_out(|out| render::render_message(out, message))?;
        self.render(term)
    }

    /// Flash the header for `duration`, then redraw.
    pub async fn blink(&self, term: &Terminal, duration: Duration) -> io::Result<()> {
        term.with_out(|out| render::render_blink(out, &self.header))?;
        tokio::time::sleep(duration).await;
        self.render(term)
    }

    /// Mark the buffer complete and draw the final line.
    pub fn finish(&mut self, term: &Terminal) -> io::Result<()> {
        self.buffer.complete();
        self.render(term)
    }

    /// Replace the text, mark complete and draw it. Used to echo an answer.
    pub fn finish_with(&mut self, term: &Terminal, text: &str) -> io::Result<()> {
        self.buffer.set_suggestion(None);
        self.buffer.replace(text);
        self.finish(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedKeys;

    #[test]
    fn test_apply_edits() {
        let mut editor = LineEditor::new("> ");
        assert!(editor.apply(KeyAction::Insert('a')));
        assert!(editor.apply(KeyAction::Insert('b')));
        assert!(editor.apply(KeyAction::MoveHome));
        assert!(editor.apply(KeyAction::DeleteRight));
        assert_eq!(editor.buffer().text(), "b");
        assert!(!editor.apply(KeyAction::Submit));
    }

    #[test]
    fn test_finish_echoes_masked_text() {
        let (term, out) = Terminal::scripted(ScriptedKeys::default());
        let mut editor = LineEditor::new("pin: ").masked('•');
        editor.buffer_mut().insert_str("1234");
        editor.finish(&term).unwrap();
        assert!(out.contents().contains("pin: ••••\r\n"));
        assert!(editor.buffer().is_complete());
    }
}
