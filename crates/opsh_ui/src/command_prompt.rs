//! The command line: editing, history recall and Tab completion.

use std::time::Duration;

use crossterm::event::KeyEvent;
use opsh_core::{Candidate, CompletionEngine};
use opsh_parser::{parse, quote};
use tracing::{debug, warn};

use crate::buffer::LineBuffer;
use crate::config::UiConfig;
use crate::editor::LineEditor;
use crate::error::{UiError, UiResult};
use crate::history::History;
use crate::keymap::{self, KeyAction, KeyMapStack};
use crate::picker::{CompletionPicker, PickerOutcome};
use crate::session::Session;
use crate::terminal::Terminal;

/// Reads one command line.
#[derive(Debug, Clone)]
pub struct CommandPrompt {
    engine: CompletionEngine,
    header: String,
    page_size: usize,
    busy_debounce: Duration,
    blink: Duration,
}

impl CommandPrompt {
    pub fn new(engine: CompletionEngine, config: &UiConfig) -> Self {
        Self {
            engine,
            header: config.prompt.clone(),
            page_size: config.page_size,
            busy_debounce: config.busy_debounce(),
            blink: config.blink(),
        }
    }

    /// Read until a non-blank line is submitted.
    pub async fn read(&self, session: &mut Session) -> UiResult<String> {
        let Session {
            terminal,
            keymaps,
            history,
            ..
        } = session;
        let _raw = terminal.raw_mode()?;
        let _frame = keymaps.enter(keymap::command_prompt());

        let mut editor = LineEditor::new(&self.header);
        let mut draft = String::new();
        let mut pending: Option<KeyEvent> = None;
        history.reset_scroll();
        editor.render(terminal)?;

        loop {
            let key = match pending.take() {
                Some(key) => key,
                None => terminal.read_key().await?,
            };
            let Some(action) = keymaps.dispatch(&key) else {
                continue;
            };

            match action {
                KeyAction::Interrupt => {
                    editor.finish(terminal)?;
                    return Err(UiError::Interrupted);
                }
                KeyAction::Submit => {
                    let line = editor.buffer().text();
                    if line.trim().is_empty() {
                        editor.blink(terminal, self.blink).await?;
                        continue;
                    }
                    editor.finish(terminal)?;
                    return Ok(line);
                }
                KeyAction::EndOfInput if editor.buffer().is_empty() => {
                    editor.finish(terminal)?;
                    return Err(UiError::InputClosed);
                }
                KeyAction::EndOfInput => {
                    editor.apply(KeyAction::DeleteRight);
                }
                KeyAction::HistoryPrevious => {
                    if history.scroll_index().is_none() {
                        draft = editor.buffer().text();
                    }
                    if let Some(entry) = history.previous() {
                        let entry = entry.to_string();
                        editor.buffer_mut().replace(&entry);
                    }
                }
                KeyAction::HistoryNext => {
                    if history.scroll_index().is_some() {
                        let text = history.next().map(str::to_string);
                        editor.buffer_mut().replace(text.as_deref().unwrap_or(&draft));
                    }
                }
                KeyAction::Complete => {
                    pending = self.complete(&mut editor, terminal, keymaps).await?;
                }
                KeyAction::Insert(_) => {
                    history.reset_scroll();
                    editor.apply(action);
                }
                other => {
                    editor.apply(other);
                }
            }

            refresh_suggestion(editor.buffer_mut(), history);
            editor.render(terminal)?;
        }
    }

    /// Complete the text left of the cursor.
    ///
    /// Returns a key the picker did not consume, for the caller to handle.
    async fn complete(
        &self,
        editor: &mut LineEditor,
        terminal: &Terminal,
        keymaps: &KeyMapStack,
    ) -> UiResult<Option<KeyEvent>> {
        let before = editor.buffer().text_before_cursor();
        let completion = self.engine.complete(&before);
        tokio::pin!(completion);

        let result = tokio::select! {
            result = &mut completion => result,
            _ = tokio::time::sleep(self.busy_debounce) => {
                editor.render_busy(terminal)?;
                let result = completion.await;
                editor.render(terminal)?;
                result
            }
        };

        let mut candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("completion failed: {e:#}");
                editor.show_error(terminal, &e.to_string())?;
                return Ok(None);
            }
        };
        debug!(line = %before, count = candidates.len(), "completion candidates");

        match candidates.len() {
            0 => Ok(None),
            1 => {
                apply_candidate(editor.buffer_mut(), &before, &candidates[0]);
                Ok(None)
            }
            _ => {
                candidates.sort_by(|a, b| a.value.cmp(&b.value));
                let mut picker = CompletionPicker::new(candidates, self.page_size).escaping(true);
                match picker.pick(terminal, keymaps).await? {
                    PickerOutcome::Selected(candidate) => {
                        apply_candidate(editor.buffer_mut(), &before, &candidate);
                        Ok(None)
                    }
                    PickerOutcome::Cancelled => Ok(None),
                    PickerOutcome::Escaped(key) => Ok(Some(key)),
                }
            }
        }
    }
}

/// Replace the token being typed at the end of `before` with the quoted
/// candidate and a trailing space.
pub fn apply_candidate(buffer: &mut LineBuffer, before: &str, candidate: &Candidate) {
    let start_byte = parse(before)
        .tokens()
        .last()
        .filter(|token| token.end == before.len())
        .map(|token| token.start)
        .unwrap_or(before.len());
    let start = before[..start_byte].chars().count();
    let end = before.chars().count();
    buffer.splice(start..end, &format!("{} ", quote(&candidate.value)));
}

fn refresh_suggestion(buffer: &mut LineBuffer, history: &History) {
    let suggestion = if buffer.cursor() == buffer.len() {
        history.suggestion(&buffer.text())
    } else {
        None
    };
    buffer.set_suggestion(suggestion);
}
