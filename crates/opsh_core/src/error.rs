//! Error types for registration, resolution, dispatch and completion.

use thiserror::Error;

/// Setup-time registry failures. These are fatal for the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command id `{id}` is already registered")]
    Duplicate { id: String },
    #[error("invalid command name `{name}`")]
    InvalidName { name: String },
}

/// Failure to map words onto a registered, enabled definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown command: {command}")]
    NotFound { command: String },
    #[error("command is disabled: {command}")]
    Disabled { command: String },
}

/// Failure to run one command context.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("missing required argument(s) for `{usage}`: {}", .names.join(", "))]
    MissingArguments { usage: String, names: Vec<String> },

    #[error("too many arguments for `{usage}`: expected at most {expected}, got {got}")]
    TooManyArguments {
        usage: String,
        expected: usize,
        got: usize,
    },

    #[error("option --{option} requires a value")]
    MissingOptionValue { option: String },

    #[error("invalid value for {target}: {source}")]
    Validation {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("`{usage}` failed: {source:#}")]
    Execution {
        usage: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Failure inside the completion engine. Only collaborator code can fail.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("candidate provider for {target} failed: {source:#}")]
    Provider {
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type DispatchResult<T> = Result<T, DispatchError>;
