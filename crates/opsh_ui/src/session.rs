//! Per-process UI state passed explicitly to the REPL and its widgets.

use opsh_core::Candidate;

use crate::config::UiConfig;
use crate::error::UiResult;
use crate::history::History;
use crate::keymap::KeyMapStack;
use crate::prompt::{ChoiceList, Confirmation, Prompt};
use crate::terminal::Terminal;

/// Terminal, key maps, history and configuration for one shell session.
#[derive(Debug)]
pub struct Session {
    pub terminal: Terminal,
    pub keymaps: KeyMapStack,
    pub history: History,
    pub config: UiConfig,
}

impl Session {
    pub fn new(terminal: Terminal, history: History, config: UiConfig) -> Self {
        Self {
            terminal,
            keymaps: KeyMapStack::new(),
            history,
            config,
        }
    }

    /// Build a session, loading history from the configured file if any.
    pub async fn open(terminal: Terminal, config: UiConfig) -> Self {
        let history = match &config.history_file {
            Some(path) => History::load(path.clone(), config.history_limit).await,
            None => History::in_memory(config.history_limit),
        };
        Self::new(terminal, history, config)
    }

    /// Handle for command bodies that need to ask questions.
    pub fn asker(&self) -> Asker {
        Asker {
            terminal: self.terminal.clone(),
            keymaps: self.keymaps.clone(),
            page_size: self.config.page_size,
            mask_glyph: self.config.mask_glyph,
        }
    }
}

/// Cloneable access to the question widgets, for use inside `execute` bodies.
#[derive(Debug, Clone)]
pub struct Asker {
    terminal: Terminal,
    keymaps: KeyMapStack,
    page_size: usize,
    mask_glyph: char,
}

impl Asker {
    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub async fn confirm(&self, question: &str, default: bool) -> UiResult<bool> {
        Confirmation::new(question)
            .default_answer(default)
            .read(&self.terminal, &self.keymaps)
            .await
    }

    pub async fn ask(&self, prompt: &Prompt) -> UiResult<String> {
        prompt.read(&self.terminal, &self.keymaps).await
    }

    /// Ask for a secret, drawn with the configured mask glyph.
    pub async fn secret(&self, header: &str) -> UiResult<String> {
        Prompt::new(header)
            .masked(self.mask_glyph)
            .read(&self.terminal, &self.keymaps)
            .await
    }

    pub async fn choose(&self, header: &str, candidates: Vec<Candidate>) -> UiResult<Option<Candidate>> {
        ChoiceList::new(header, candidates)
            .page_size(self.page_size)
            .read(&self.terminal, &self.keymaps)
            .await
    }
}
