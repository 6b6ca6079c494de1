//! Key maps and the key-map stack.
//!
//! Each widget pushes its own map for as long as it reads keys. Only the top
//! frame is consulted, so a nested picker fully owns the keyboard until it
//! closes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

use crate::keys::chord;

/// Action a key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    // Editing
    Insert(char),
    DeleteLeft,
    DeleteRight,
    DeleteWordLeft,
    DeleteWordRight,

    // Movement
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveHome,
    MoveEnd,

    // History
    HistoryPrevious,
    HistoryNext,

    Complete,

    // Picker navigation
    Next,
    Previous,
    First,
    Last,
    PageForward,
    PageBack,
    Jump(usize),

    // Control
    Answer(bool),
    Submit,
    Cancel,
    Interrupt,
    /// End of input on an empty line, delete right otherwise
    EndOfInput,
}

/// Handler for printable characters no chord matched.
pub type CharHandler = fn(char) -> KeyAction;

/// Chord → action bindings plus an optional character fallback.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    name: &'static str,
    bindings: HashMap<String, KeyAction>,
    fallback: Option<CharHandler>,
}

impl KeyMap {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bind(mut self, chord: impl Into<String>, action: KeyAction) -> Self {
        self.bindings.insert(chord.into(), action);
        self
    }

    pub fn with_fallback(mut self, handler: CharHandler) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Action for `event`, if this map handles it.
    pub fn lookup(&self, event: &KeyEvent) -> Option<KeyAction> {
        if let Some(action) = self.bindings.get(&chord(event)) {
            return Some(*action);
        }
        let plain = !event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::META);
        match (event.code, self.fallback) {
            (KeyCode::Char(c), Some(handler)) if plain => Some(handler(c)),
            _ => None,
        }
    }
}

/// Shared stack of key maps. Cloning yields another handle to the same stack.
#[derive(Debug, Clone, Default)]
pub struct KeyMapStack {
    frames: Rc<RefCell<Vec<KeyMap>>>,
}

impl KeyMapStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, map: KeyMap) {
        trace!(map = map.name, depth = self.depth() + 1, "push key map");
        self.frames.borrow_mut().push(map);
    }

    pub fn pop(&self) -> Option<KeyMap> {
        self.frames.borrow_mut().pop()
    }

    /// Push `map` and pop it again when the returned frame drops.
    pub fn enter(&self, map: KeyMap) -> KeyMapFrame {
        self.push(map);
        KeyMapFrame {
            stack: self.clone(),
            depth: self.depth(),
        }
    }

    /// Route `event` to the top frame only.
    pub fn dispatch(&self, event: &KeyEvent) -> Option<KeyAction> {
        self.frames.borrow().last().and_then(|map| map.lookup(event))
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Guard returned by [`KeyMapStack::enter`].
#[derive(Debug)]
pub struct KeyMapFrame {
    stack: KeyMapStack,
    depth: usize,
}

impl Drop for KeyMapFrame {
    fn drop(&mut self) {
        // Also discards frames pushed above this one and never popped.
        self.stack
            .frames
            .borrow_mut()
            .truncate(self.depth.saturating_sub(1));
    }
}

fn insert_char(c: char) -> KeyAction {
    KeyAction::Insert(c)
}

/// Line editing shared by every text widget.
pub fn editing() -> KeyMap {
    KeyMap::new("editing")
        .bind("ctrl+c", KeyAction::Interrupt)
        .bind("return", KeyAction::Submit)
        .bind("backspace", KeyAction::DeleteLeft)
        .bind("delete", KeyAction::DeleteRight)
        .bind("ctrl+d", KeyAction::DeleteRight)
        .bind("ctrl+w", KeyAction::DeleteWordLeft)
        .bind("ctrl+backspace", KeyAction::DeleteWordLeft)
        .bind("meta+backspace", KeyAction::DeleteWordLeft)
        .bind("meta+d", KeyAction::DeleteWordRight)
        .bind("ctrl+delete", KeyAction::DeleteWordRight)
        .bind("left", KeyAction::MoveLeft)
        .bind("ctrl+b", KeyAction::MoveLeft)
        .bind("right", KeyAction::MoveRight)
        .bind("ctrl+f", KeyAction::MoveRight)
        .bind("ctrl+left", KeyAction::MoveWordLeft)
        .bind("meta+b", KeyAction::MoveWordLeft)
        .bind("ctrl+right", KeyAction::MoveWordRight)
        .bind("meta+f", KeyAction::MoveWordRight)
        .bind("home", KeyAction::MoveHome)
        .bind("ctrl+a", KeyAction::MoveHome)
        .bind("end", KeyAction::MoveEnd)
        .bind("ctrl+e", KeyAction::MoveEnd)
        .bind("space", KeyAction::Insert(' '))
        .with_fallback(insert_char)
}

/// Editing plus history and completion.
pub fn command_prompt() -> KeyMap {
    let mut map = editing()
        .bind("up", KeyAction::HistoryPrevious)
        .bind("ctrl+p", KeyAction::HistoryPrevious)
        .bind("down", KeyAction::HistoryNext)
        .bind("ctrl+n", KeyAction::HistoryNext)
        .bind("ctrl+d", KeyAction::EndOfInput)
        .bind("tab", KeyAction::Complete);
    map.name = "command-prompt";
    map
}

/// Picker navigation. Digits jump to a row of the visible page.
pub fn picker() -> KeyMap {
    let mut map = KeyMap::new("picker")
        .bind("ctrl+c", KeyAction::Interrupt)
        .bind("return", KeyAction::Submit)
        .bind("escape", KeyAction::Cancel)
        .bind("down", KeyAction::Next)
        .bind("tab", KeyAction::Next)
        .bind("ctrl+n", KeyAction::Next)
        .bind("up", KeyAction::Previous)
        .bind("shift+tab", KeyAction::Previous)
        .bind("ctrl+p", KeyAction::Previous)
        .bind("home", KeyAction::First)
        .bind("end", KeyAction::Last)
        .bind("pagedown", KeyAction::PageForward)
        .bind("pageup", KeyAction::PageBack);
    for digit in 0..10 {
        map = map.bind(digit.to_string(), KeyAction::Jump(digit));
    }
    map
}

/// Yes/no answers.
pub fn confirmation() -> KeyMap {
    KeyMap::new("confirmation")
        .bind("ctrl+c", KeyAction::Interrupt)
        .bind("return", KeyAction::Submit)
        .bind("y", KeyAction::Answer(true))
        .bind("Y", KeyAction::Answer(true))
        .bind("n", KeyAction::Answer(false))
        .bind("N", KeyAction::Answer(false))
}
