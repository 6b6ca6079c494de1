//! Full-line redraw of a header plus a line buffer.

use std::io::{self, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use unicode_width::UnicodeWidthStr;

use crate::buffer::LineBuffer;

/// Visible text of the buffer, masked if requested.
fn visible(buffer: &LineBuffer, mask: Option<char>) -> (String, String) {
    let text = buffer.text();
    let before = buffer.text_before_cursor();
    match mask {
        Some(glyph) => (
            std::iter::repeat(glyph).take(buffer.len()).collect(),
            std::iter::repeat(glyph).take(buffer.cursor()).collect(),
        ),
        None => (text, before),
    }
}

/// Redraw the whole line.
///
/// Returns to column 0, erases to the end of the line and writes the header
/// and content. Active lines get the dim suggestion and the cursor placed at
/// the edit position. Complete lines move to the next line.
pub fn render_line<W: Write>(
    out: &mut W,
    header: &str,
    buffer: &LineBuffer,
    mask: Option<char>,
) -> io::Result<()> {
    let (content, before) = visible(buffer, mask);
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::UntilNewLine),
        Print(header),
        Print(&content)
    )?;

    if buffer.is_complete() {
        queue!(out, Print("\r\n"), Clear(ClearType::FromCursorDown))?;
        return out.flush();
    }

    if let (Some(suggestion), None) = (buffer.suggestion(), mask) {
        queue!(
            out,
            SetAttribute(Attribute::Dim),
            Print(suggestion),
            SetAttribute(Attribute::Reset)
        )?;
    }
    let column = header.width() + before.width();
    queue!(out, MoveToColumn(column_u16(column)))?;
    out.flush()
}

/// Redraw the line with a trailing busy marker.
pub fn render_busy<W: Write>(
    out: &mut W,
    header: &str,
    buffer: &LineBuffer,
    mask: Option<char>,
) -> io::Result<()> {
    let (content, before) = visible(buffer, mask);
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::UntilNewLine),
        Print(header),
        Print(&content),
        SetAttribute(Attribute::Dim),
        Print(" …"),
        SetAttribute(Attribute::Reset),
        MoveToColumn(column_u16(header.width() + before.width()))
    )?;
    out.flush()
}

/// Draw the header in reverse video, used as a short visual bell.
pub fn render_blink<W: Write>(out: &mut W, header: &str) -> io::Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        SetAttribute(Attribute::Reverse),
        Print(header),
        SetAttribute(Attribute::Reset)
    )?;
    out.flush()
}

/// Show `message` on the row below the line, leaving the cursor on the line.
pub fn render_message<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    let first = message.lines().next().unwrap_or_default();
    queue!(
        out,
        Print("\r\n"),
        Clear(ClearType::UntilNewLine),
        SetForegroundColor(Color::Red),
        Print(first),
        ResetColor,
        MoveUp(1)
    )?;
    out.flush()
}

pub(crate) fn column_u16(column: usize) -> u16 {
    u16::try_from(column).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(header: &str, buffer: &LineBuffer, mask: Option<char>) -> String {
        let mut out = Vec::new();
        render_line(&mut out, header, buffer, mask).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_active_line_places_cursor() {
        let mut buf = LineBuffer::with_text("abc");
        buf.move_left();
        let screen = draw("> ", &buf, None);
        assert!(screen.starts_with("\u{1b}[1G"));
        assert!(screen.contains("> abc"));
        // header width 2 + cursor 2, zero based column 4 → 1-based 5
        assert!(screen.ends_with("\u{1b}[5G"));
    }

    #[test]
    fn test_mask_hides_content() {
        let buf = LineBuffer::with_text("secret");
        let screen = draw("pw: ", &buf, Some('*'));
        assert!(screen.contains("pw: ******"));
        assert!(!screen.contains("secret"));
    }

    #[test]
    fn test_suggestion_is_drawn_after_content() {
        let mut buf = LineBuffer::with_text("wid");
        buf.set_suggestion(Some("gets".into()));
        let screen = draw("> ", &buf, None);
        let content = screen.find("wid").unwrap();
        let suggestion = screen.find("gets").unwrap();
        assert!(content < suggestion);
    }

    #[test]
    fn test_complete_line_moves_down() {
        let mut buf = LineBuffer::with_text("done");
        buf.complete();
        let screen = draw("> ", &buf, None);
        assert!(screen.contains("> done\r\n"));
    }

    #[test]
    fn test_wide_characters_count_columns() {
        let buf = LineBuffer::with_text("日本");
        let screen = draw("", &buf, None);
        assert!(screen.ends_with("\u{1b}[5G"));
    }
}
