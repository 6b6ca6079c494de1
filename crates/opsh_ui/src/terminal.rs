//! Terminal handle: an output writer plus a source of key events.
//!
//! Production uses stdout and the crossterm event stream. Tests and
//! non-interactive runs use [`ScriptedKeys`] and a [`Capture`] buffer.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use crossterm::terminal;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::StreamExt;
use tracing::trace;

use crate::error::{UiError, UiResult};
use crate::keys::parse_chord;

/// Asynchronous source of key presses. `Ok(None)` means the input is closed.
pub trait KeySource {
    fn next_key(&mut self) -> LocalBoxFuture<'_, io::Result<Option<KeyEvent>>>;
}

/// Key presses from the real terminal.
pub struct CrosstermKeys {
    events: EventStream,
}

impl CrosstermKeys {
    pub fn new() -> Self {
        Self {
            events: EventStream::new(),
        }
    }
}

impl Default for CrosstermKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for CrosstermKeys {
    fn next_key(&mut self) -> LocalBoxFuture<'_, io::Result<Option<KeyEvent>>> {
        async move {
            while let Some(event) = self.events.next().await {
                match event? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => return Ok(Some(key)),
                    _ => continue,
                }
            }
            Ok(None)
        }
        .boxed_local()
    }
}

/// Pre-recorded key presses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<KeyEvent>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Build from chord names such as `"w"`, `"tab"`, `"ctrl+c"`.
    /// Unknown chord names are skipped.
    pub fn chords<'a>(chords: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(chords.into_iter().filter_map(parse_chord))
    }

    /// Append each character of `text` as a key press.
    pub fn text(mut self, text: &str) -> Self {
        self.keys.extend(text.chars().filter_map(|c| match c {
            ' ' => parse_chord("space"),
            c => parse_chord(&c.to_string()),
        }));
        self
    }

    /// Append chord names.
    pub fn then<'a>(mut self, chords: impl IntoIterator<Item = &'a str>) -> Self {
        self.keys.extend(chords.into_iter().filter_map(parse_chord));
        self
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> LocalBoxFuture<'_, io::Result<Option<KeyEvent>>> {
        let key = self.keys.pop_front();
        async move { Ok(key) }.boxed_local()
    }
}

/// In-memory output sink. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.bytes.borrow_mut().clear();
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Output writer and key source used by every widget.
///
/// Cloning yields another handle to the same terminal, so command bodies can
/// ask questions while the REPL is running them.
#[derive(Clone)]
pub struct Terminal {
    shared: Rc<Shared>,
}

struct Shared {
    out: RefCell<Box<dyn Write>>,
    keys: RefCell<Option<Box<dyn KeySource>>>,
    interactive: bool,
    raw_depth: Rc<Cell<usize>>,
}

impl Terminal {
    fn from_parts(out: Box<dyn Write>, keys: Box<dyn KeySource>, interactive: bool) -> Self {
        Self {
            shared: Rc::new(Shared {
                out: RefCell::new(out),
                keys: RefCell::new(Some(keys)),
                interactive,
                raw_depth: Rc::default(),
            }),
        }
    }

    /// The process terminal: stdout and crossterm key events.
    pub fn stdout() -> Self {
        Self::from_parts(Box::new(io::stdout()), Box::new(CrosstermKeys::new()), true)
    }

    /// A terminal that never touches the tty. Raw mode is a no-op.
    pub fn headless(out: impl Write + 'static, keys: impl KeySource + 'static) -> Self {
        Self::from_parts(Box::new(out), Box::new(keys), false)
    }

    /// Headless terminal fed by `keys`, returning a handle on what it printed.
    pub fn scripted(keys: ScriptedKeys) -> (Self, Capture) {
        let capture = Capture::default();
        (Self::headless(capture.clone(), keys), capture)
    }

    pub fn is_interactive(&self) -> bool {
        self.shared.interactive
    }

    /// Run `f` against the output writer.
    pub fn with_out<R>(&self, f: impl FnOnce(&mut Box<dyn Write>) -> io::Result<R>) -> io::Result<R> {
        f(&mut *self.shared.out.borrow_mut())
    }

    /// Wait for the next key press.
    ///
    /// The key source is moved out of the handle while waiting, so two
    /// concurrent reads fail instead of interleaving.
    pub async fn read_key(&self) -> UiResult<KeyEvent> {
        let taken = self.shared.keys.borrow_mut().take();
        let Some(mut keys) = taken else {
            return Err(UiError::Io(io::Error::new(
                io::ErrorKind::WouldBlock,
                "key source is already being read",
            )));
        };
        let next = keys.next_key().await;
        *self.shared.keys.borrow_mut() = Some(keys);

        match next? {
            Some(key) => {
                trace!(?key, "key");
                Ok(key)
            }
            None => Err(UiError::InputClosed),
        }
    }

    /// Print `text` followed by a newline. Embedded newlines become `\r\n`
    /// so output lines up in raw mode as well.
    pub fn write_line(&self, text: &str) -> io::Result<()> {
        self.with_out(|out| {
            for line in text.split('\n') {
                write!(out, "{line}\r\n")?;
            }
            out.flush()
        })
    }

    /// Enable raw mode until the guard drops. Nested guards are counted.
    pub fn raw_mode(&self) -> io::Result<RawModeGuard> {
        let depth = &self.shared.raw_depth;
        if self.shared.interactive && depth.get() == 0 {
            terminal::enable_raw_mode()?;
        }
        depth.set(depth.get() + 1);
        Ok(RawModeGuard {
            depth: Rc::clone(depth),
            interactive: self.shared.interactive,
        })
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("interactive", &self.shared.interactive)
            .field("raw_depth", &self.shared.raw_depth.get())
            .finish()
    }
}

/// Restores cooked mode when the outermost guard drops.
#[derive(Debug)]
pub struct RawModeGuard {
    depth: Rc<Cell<usize>>,
    interactive: bool,
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth == 0 && self.interactive {
            let _ = terminal::disable_raw_mode();
        }
    }
}
