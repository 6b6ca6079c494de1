//! Error type shared by every widget and the REPL loop.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    /// Ctrl+C in any widget.
    #[error("interrupted")]
    Interrupted,

    /// The key source ran dry, e.g. stdin closed or a script finished.
    #[error("input closed")]
    InputClosed,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl UiError {
    /// Process exit status for an error that ends the session.
    pub fn exit_code(&self) -> i32 {
        match self {
            UiError::Interrupted => 130,
            UiError::InputClosed => 0,
            UiError::Io(_) => 1,
        }
    }
}

pub type UiResult<T> = Result<T, UiError>;
