//! Command model for opsh: definitions, the registry, dispatch and completion.
//!
//! Everything here is single threaded. The registry is shared behind an `Rc`
//! between the [`Dispatcher`] and the [`CompletionEngine`].

pub mod completion;
pub mod definition;
pub mod dispatch;
pub mod error;
pub mod registry;

pub use completion::CompletionEngine;
pub use definition::{
    ArgumentDef, Candidate, CandidateFuture, CandidateProvider, CommandDefinition, Executor,
    Invocation, OptionDef, OptionValue, Validator,
};
pub use dispatch::{camel_case, ContextRun, Dispatcher, Outcome, Prepared};
pub use error::{CompletionError, DispatchError, DispatchResult, RegistryError, ResolveError};
pub use registry::{Registry, Resolution, ID_SEPARATOR};
