//! Key-chord names.
//!
//! A chord is the canonical string for a key event: `ctrl+a`, `shift+tab`,
//! `pagedown`, `A`. Key maps are keyed by these strings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Canonical chord for `event`.
///
/// Modifiers are prefixed in the fixed order `ctrl+`, `meta+`, `shift+`.
/// A printable character without ctrl or meta is the character itself, with
/// shift already folded in.
pub fn chord(event: &KeyEvent) -> String {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let meta = event
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::META);
    let mut shift = event.modifiers.contains(KeyModifiers::SHIFT);

    let base = match event.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) if ctrl || meta => c.to_lowercase().collect(),
        KeyCode::Char(c) => return c.to_string(),
        KeyCode::BackTab => {
            shift = true;
            "tab".to_string()
        }
        KeyCode::Enter => "return".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Esc => "escape".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => "unknown".to_string(),
    };

    let mut out = String::new();
    if ctrl {
        out.push_str("ctrl+");
    }
    if meta {
        out.push_str("meta+");
    }
    if shift {
        out.push_str("shift+");
    }
    out.push_str(&base);
    out
}

/// Inverse of [`chord`], used to script key sequences.
pub fn parse_chord(chord: &str) -> Option<KeyEvent> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = chord;
    loop {
        if let Some(tail) = rest.strip_prefix("ctrl+") {
            modifiers |= KeyModifiers::CONTROL;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("meta+") {
            modifiers |= KeyModifiers::ALT;
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("shift+") {
            modifiers |= KeyModifiers::SHIFT;
            rest = tail;
        } else {
            break;
        }
    }

    let code = match rest {
        "space" => KeyCode::Char(' '),
        "return" => KeyCode::Enter,
        "tab" if modifiers.contains(KeyModifiers::SHIFT) => KeyCode::BackTab,
        "tab" => KeyCode::Tab,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "escape" => KeyCode::Esc,
        "insert" => KeyCode::Insert,
        _ => {
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                (Some('f'), Some(_)) => KeyCode::F(rest[1..].parse().ok()?),
                _ => return None,
            }
        }
    };
    Some(KeyEvent::new(code, modifiers))
}
