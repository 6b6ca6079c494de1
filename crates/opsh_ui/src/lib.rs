//! Terminal side of opsh: key handling, line editing, widgets and the REPL.
//!
//! Widgets read keys through a [`Terminal`] handle and route them through the
//! shared [`KeyMapStack`]; the topmost map owns the keyboard. All state lives
//! in a [`Session`] handed to the [`Repl`] at construction.

#![allow(clippy::uninlined_format_args)]

pub mod buffer;
pub mod command_prompt;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod keymap;
pub mod keys;
pub mod picker;
pub mod prompt;
pub mod render;
pub mod repl;
pub mod session;
pub mod terminal;

pub use buffer::{LineBuffer, Status};
pub use command_prompt::{apply_candidate, CommandPrompt};
pub use config::UiConfig;
pub use editor::LineEditor;
pub use error::{UiError, UiResult};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use keymap::{KeyAction, KeyMap, KeyMapFrame, KeyMapStack};
pub use keys::{chord, parse_chord};
pub use picker::{CompletionPicker, PickerOutcome, DEFAULT_PAGE_SIZE};
pub use prompt::{ChoiceList, Confirmation, Prompt};
pub use repl::Repl;
pub use session::{Asker, Session};
pub use terminal::{Capture, CrosstermKeys, KeySource, RawModeGuard, ScriptedKeys, Terminal};
