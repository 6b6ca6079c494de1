//! Turns a parsed line into invocations and runs them.
//!
//! Execution reads the same [`LineAst`] the completion engine reads, so what
//! completes and what runs can never disagree on token boundaries.

use std::collections::BTreeMap;
use std::rc::Rc;

use opsh_parser::{parse, AstNode, CommandContext, Connective, LineAst, Token, TokenKind};
use tracing::{debug, warn};

use crate::definition::{CommandDefinition, Invocation, OptionValue};
use crate::error::{DispatchError, DispatchResult, ResolveError};
use crate::registry::{Registry, Resolution};

/// What running one command context produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `execute()` ran and returned `Ok`
    Executed { id: String },
    /// Help was requested, or the command is a group without a body
    Help { id: String, text: String },
}

/// Report for one command context of a line.
#[derive(Debug)]
pub struct ContextRun {
    /// Raw text of the context
    pub text: String,
    pub result: DispatchResult<Outcome>,
}

impl ContextRun {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Resolved command plus the invocation handed to its executor.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub resolution: Resolution,
    pub invocation: Invocation,
    pub help_requested: bool,
}

/// Runs lines against a registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Rc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Rc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    /// Run every context of `line`, honouring `&&` and `||`.
    ///
    /// Contexts skipped by a connective produce no report.
    pub async fn run_line(&self, line: &str) -> Vec<ContextRun> {
        let ast = parse(line);
        self.run_ast(line, &ast).await
    }

    pub async fn run_ast(&self, line: &str, ast: &LineAst) -> Vec<ContextRun> {
        let mut runs = Vec::new();
        let mut last_ok: Option<bool> = None;
        let mut pending: Option<Connective> = None;

        for node in &ast.nodes {
            match node {
                AstNode::Operator(token) => pending = token.connective(),
                AstNode::Context(ctx) => {
                    let skip = matches!(
                        (pending.take(), last_ok),
                        (Some(Connective::And), Some(false)) | (Some(Connective::Or), Some(true))
                    );
                    let text = line[ctx.start()..ctx.end()].to_string();
                    if skip {
                        debug!(context = %text, "skipped by connective");
                        continue;
                    }
                    let result = self.run_context(ctx, &text).await;
                    last_ok = Some(result.is_ok());
                    runs.push(ContextRun { text, result });
                }
            }
        }

        runs
    }

    async fn run_context(&self, ctx: &CommandContext, text: &str) -> DispatchResult<Outcome> {
        let prepared = self.prepare(ctx, text)?;
        let def = &prepared.resolution.definition;
        let id = prepared.resolution.id.clone();

        if prepared.help_requested {
            return Ok(Outcome::Help {
                text: def.help_text(&id),
                id,
            });
        }

        let Some(executor) = def.executor.clone() else {
            check_group_words(def, &id, &prepared.invocation)?;
            // Command groups without a body show their help.
            return Ok(Outcome::Help {
                text: def.help_text(&id),
                id,
            });
        };

        check_arguments(def, &id, &prepared.invocation)?;
        validate(def, &prepared.invocation)?;

        debug!(%id, positional = ?prepared.invocation.positional, "executing");
        match executor(prepared.invocation).await {
            Ok(()) => Ok(Outcome::Executed { id }),
            Err(source) => {
                warn!(%id, "command failed: {source:#}");
                Err(DispatchError::Execution {
                    usage: id.replace(':', " "),
                    source,
                })
            }
        }
    }

    /// Resolve a context and build its invocation without running it.
    pub fn prepare(&self, ctx: &CommandContext, text: &str) -> DispatchResult<Prepared> {
        let words = ctx.leading_words();
        let resolution = self.registry.resolve(&words)?;
        let (invocation, help_requested) =
            build_invocation(&resolution, &ctx.tokens[resolution.depth..], text)?;
        Ok(Prepared {
            resolution,
            invocation,
            help_requested,
        })
    }
}

fn build_invocation(
    resolution: &Resolution,
    rest: &[Token],
    text: &str,
) -> DispatchResult<(Invocation, bool)> {
    let def = &resolution.definition;
    let mut positional = Vec::new();
    let mut options = BTreeMap::new();
    let mut help_requested = false;

    let mut tokens = rest.iter().peekable();
    while let Some(token) = tokens.next() {
        if token.kind != TokenKind::CommandOptionKey {
            positional.push(token.value());
            continue;
        }

        let key = token.option_name().unwrap_or_default();
        if key.is_empty() {
            positional.push(token.value());
            continue;
        }

        let known = def.find_option(&key);
        if known.is_none() && (key == "help" || key == "h") {
            help_requested = true;
            continue;
        }

        let takes_value = known.map(|opt| opt.takes_value).unwrap_or(true);
        let next_is_value = tokens
            .peek()
            .is_some_and(|next| next.kind == TokenKind::CommandOptionValue);

        let value = if takes_value && next_is_value {
            tokens.next().map(|next| OptionValue::Value(next.value()))
        } else {
            None
        };

        let name = known.map(|opt| opt.name.clone()).unwrap_or(key);
        let value = match (value, known) {
            (Some(value), _) => value,
            (None, Some(opt)) if opt.takes_value => {
                return Err(DispatchError::MissingOptionValue { option: opt.name.clone() });
            }
            (None, _) => OptionValue::Flag,
        };
        options.insert(camel_case(&name), value);
    }

    Ok((
        Invocation {
            id: resolution.id.clone(),
            positional,
            options,
            line: text.to_string(),
        },
        help_requested,
    ))
}

fn check_arguments(def: &CommandDefinition, id: &str, inv: &Invocation) -> DispatchResult<()> {
    let missing: Vec<String> = def
        .arguments
        .iter()
        .skip(inv.positional.len())
        .filter(|arg| arg.required)
        .map(|arg| arg.name.clone())
        .collect();
    if !missing.is_empty() {
        return Err(DispatchError::MissingArguments {
            usage: id.replace(':', " "),
            names: missing,
        });
    }
    if inv.positional.len() > def.arguments.len() {
        return Err(DispatchError::TooManyArguments {
            usage: id.replace(':', " "),
            expected: def.arguments.len(),
            got: inv.positional.len(),
        });
    }
    Ok(())
}

/// Leftover words after a group name are an unknown subcommand, or too
/// many arguments for a group without subcommands.
fn check_group_words(def: &CommandDefinition, id: &str, inv: &Invocation) -> DispatchResult<()> {
    let Some(word) = inv.positional.first() else {
        return Ok(());
    };
    if !def.subcommands.is_empty() {
        return Err(ResolveError::NotFound {
            command: format!("{} {word}", id.replace(':', " ")),
        }
        .into());
    }
    if inv.positional.len() > def.arguments.len() {
        return Err(DispatchError::TooManyArguments {
            usage: id.replace(':', " "),
            expected: def.arguments.len(),
            got: inv.positional.len(),
        });
    }
    Ok(())
}

fn validate(def: &CommandDefinition, inv: &Invocation) -> DispatchResult<()> {
    for (arg, value) in def.arguments.iter().zip(&inv.positional) {
        if let Some(validator) = &arg.validator {
            validator(value).map_err(|source| DispatchError::Validation {
                target: format!("<{}>", arg.name),
                source,
            })?;
        }
    }
    for opt in &def.options {
        let Some(OptionValue::Value(value)) = inv.options.get(&camel_case(&opt.name)) else {
            continue;
        };
        if let Some(validator) = &opt.validator {
            validator(value).map_err(|source| DispatchError::Validation {
                target: format!("--{}", opt.name),
                source,
            })?;
        }
    }
    Ok(())
}

/// `dry-run` → `dryRun`.
pub fn camel_case(dashed: &str) -> String {
    let mut out = String::with_capacity(dashed.len());
    for (i, part) in dashed.split('-').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
