//! The read-dispatch loop.

use std::rc::Rc;

use opsh_core::{CompletionEngine, ContextRun, DispatchError, Dispatcher, Outcome, Registry};
use tracing::{debug, info, warn};

use crate::command_prompt::CommandPrompt;
use crate::error::{UiError, UiResult};
use crate::session::Session;

/// Reads command lines, records them and runs them until input ends.
#[derive(Debug)]
pub struct Repl {
    dispatcher: Dispatcher,
    prompt: CommandPrompt,
    session: Session,
}

impl Repl {
    pub fn new(registry: Rc<Registry>, session: Session) -> Self {
        let prompt = CommandPrompt::new(CompletionEngine::new(registry.clone()), &session.config);
        Self {
            dispatcher: Dispatcher::new(registry),
            prompt,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Loop until the input closes.
    ///
    /// Command failures are printed and the loop goes on. Ctrl+C and
    /// terminal I/O failures end it with an error.
    pub async fn run(&mut self) -> UiResult<()> {
        info!(
            commands = self.dispatcher.registry().len(),
            history = self.session.history.len(),
            "repl started"
        );

        loop {
            let line = match self.prompt.read(&mut self.session).await {
                Ok(line) => line,
                Err(UiError::InputClosed) => {
                    info!("input closed");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = self.session.history.submit(&line).await {
                warn!("failed to save history: {e:#}");
            }
            self.run_once(&line).await?;
        }
    }

    /// Run one line and print its help or errors.
    ///
    /// Returns whether the last context that ran succeeded, so `bad || ok`
    /// counts as success. A line with no contexts succeeds.
    pub async fn run_once(&self, line: &str) -> UiResult<bool> {
        let runs = self.dispatcher.run_line(line).await;
        for run in &runs {
            self.report(run)?;
        }
        let ok = runs.last().map_or(true, ContextRun::succeeded);
        debug!(%line, contexts = runs.len(), ok, "line finished");
        Ok(ok)
    }

    fn report(&self, run: &ContextRun) -> UiResult<()> {
        let terminal = &self.session.terminal;
        match &run.result {
            Ok(Outcome::Help { text, .. }) => terminal.write_line(text.trim_end())?,
            Ok(Outcome::Executed { .. }) => {}
            Err(DispatchError::Execution { source, .. })
                if matches!(source.downcast_ref::<UiError>(), Some(UiError::Interrupted)) =>
            {
                return Err(UiError::Interrupted);
            }
            Err(e) => terminal.write_line(&format!("error: {e}"))?,
        }
        Ok(())
    }
}
