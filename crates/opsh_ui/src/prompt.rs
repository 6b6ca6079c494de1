//! Question widgets: free text, yes/no, and pick-one-of-many.

use std::fmt;
use std::rc::Rc;

use opsh_core::{Candidate, Validator};

use crate::editor::LineEditor;
use crate::error::{UiError, UiResult};
use crate::keymap::{self, KeyAction, KeyMapStack};
use crate::picker::{CompletionPicker, PickerOutcome, DEFAULT_PAGE_SIZE};
use crate::terminal::Terminal;

/// Computes a single-line continuation of the current text.
pub type SuggestFn = Rc<dyn Fn(&str) -> Option<String>>;

/// Free-text question.
#[derive(Clone)]
pub struct Prompt {
    header: String,
    default: Option<String>,
    mask: Option<char>,
    suggest: Option<SuggestFn>,
    validator: Option<Validator>,
}

impl Prompt {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            default: None,
            mask: None,
            suggest: None,
            validator: None,
        }
    }

    /// Answer used when the line is submitted empty. Shown as a suggestion.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn masked(mut self, glyph: char) -> Self {
        self.mask = Some(glyph);
        self
    }

    pub fn suggest<F>(mut self, suggest: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        self.suggest = Some(Rc::new(suggest));
        self
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + 'static,
    {
        self.validator = Some(Rc::new(validator));
        self
    }

    fn suggestion_for(&self, text: &str) -> Option<String> {
        if text.is_empty() && self.mask.is_none() {
            if let Some(default) = &self.default {
                return Some(default.clone());
            }
        }
        self.suggest.as_ref().and_then(|suggest| suggest(text))
    }

    /// Ask until a valid answer is submitted.
    pub async fn read(&self, term: &Terminal, keymaps: &KeyMapStack) -> UiResult<String> {
        let _raw = term.raw_mode()?;
        let _frame = keymaps.enter(keymap::editing());

        let mut editor = LineEditor::new(&self.header);
        if let Some(glyph) = self.mask {
            editor = editor.masked(glyph);
        }
        editor.buffer_mut().set_suggestion(self.suggestion_for(""));
        editor.render(term)?;

        loop {
            let key = term.read_key().await?;
            match keymaps.dispatch(&key) {
                Some(KeyAction::Interrupt) => {
                    editor.finish(term)?;
                    return Err(UiError::Interrupted);
                }
                Some(KeyAction::Submit) => {
                    let mut answer = editor.buffer().text();
                    if answer.is_empty() {
                        answer = self.default.clone().unwrap_or_default();
                    }
                    if let Some(validator) = &self.validator {
                        if let Err(e) = validator(&answer) {
                            editor.show_error(term, &format!("{e:#}"))?;
                            continue;
                        }
                    }
                    editor.finish_with(term, &answer)?;
                    return Ok(answer);
                }
                Some(action) => {
                    editor.apply(action);
                }
                None => continue,
            }
            let text = editor.buffer().text();
            let suggestion = self.suggestion_for(&text);
            editor.buffer_mut().set_suggestion(suggestion);
            editor.render(term)?;
        }
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("header", &self.header)
            .field("default", &self.default)
            .field("masked", &self.mask.is_some())
            .finish()
    }
}

/// Yes/no question. `y` and `n` answer immediately; Return takes the default.
#[derive(Debug, Clone)]
pub struct Confirmation {
    question: String,
    default: bool,
}

impl Confirmation {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            default: false,
        }
    }

    pub fn default_answer(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub async fn read(&self, term: &Terminal, keymaps: &KeyMapStack) -> UiResult<bool> {
        let _raw = term.raw_mode()?;
        let _frame = keymaps.enter(keymap::confirmation());

        let hint = if self.default { "(Y/n)" } else { "(y/N)" };
        let mut editor = LineEditor::new(format!("{} {hint} ", self.question));
        editor.render(term)?;

        loop {
            let key = term.read_key().await?;
            let answer = match keymaps.dispatch(&key) {
                Some(KeyAction::Interrupt) => {
                    editor.finish(term)?;
                    return Err(UiError::Interrupted);
                }
                Some(KeyAction::Answer(answer)) => answer,
                Some(KeyAction::Submit) => self.default,
                _ => continue,
            };
            editor.finish_with(term, if answer { "yes" } else { "no" })?;
            return Ok(answer);
        }
    }
}

/// Header line plus a picker that cannot be escaped.
#[derive(Debug, Clone)]
pub struct ChoiceList {
    header: String,
    candidates: Vec<Candidate>,
    page_size: usize,
}

impl ChoiceList {
    pub fn new(header: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            header: header.into(),
            candidates,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// The chosen candidate, or `None` when there was nothing to choose.
    pub async fn read(&self, term: &Terminal, keymaps: &KeyMapStack) -> UiResult<Option<Candidate>> {
        if self.candidates.is_empty() {
            return Ok(None);
        }
        let _raw = term.raw_mode()?;

        let mut editor = LineEditor::new(&self.header);
        editor.render(term)?;
        let mut picker = CompletionPicker::new(self.candidates.clone(), self.page_size);

        match picker.pick(term, keymaps).await {
            Ok(PickerOutcome::Selected(candidate)) => {
                editor.finish_with(term, &candidate.value)?;
                Ok(Some(candidate))
            }
            Ok(_) => {
                editor.finish(term)?;
                Ok(None)
            }
            Err(e) => {
                editor.finish(term)?;
                Err(e)
            }
        }
    }
}
