//! Command definition contract supplied by the command catalog.
//!
//! Definitions are plain data plus a handful of shared closures: candidate
//! providers, validators, a disabled check and the executor. Everything is
//! `Rc` based because the shell runs on a single thread.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

/// One completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// Text inserted into the line
    pub value: String,
    /// Short human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Candidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Future resolving to candidates for one argument or option.
pub type CandidateFuture = LocalBoxFuture<'static, anyhow::Result<Vec<Candidate>>>;

/// Async candidate provider. Receives the line being completed.
pub type CandidateProvider = Rc<dyn Fn(String) -> CandidateFuture>;

/// Validator for a single argument or option value.
pub type Validator = Rc<dyn Fn(&str) -> anyhow::Result<()>>;

/// Runtime check hiding a command (and, at top level, its whole subtree).
pub type DisabledCheck = Rc<dyn Fn() -> bool>;

/// Command body.
pub type Executor = Rc<dyn Fn(Invocation) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

fn boxed_provider<F, Fut>(f: F) -> CandidateProvider
where
    F: Fn(String) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<Vec<Candidate>>> + 'static,
{
    Rc::new(move |line| f(line).boxed_local())
}

fn static_provider(values: Vec<Candidate>) -> CandidateProvider {
    Rc::new(move |_line| {
        let values = values.clone();
        async move { Ok(values) }.boxed_local()
    })
}

/// Positional argument.
#[derive(Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub provider: Option<CandidateProvider>,
    pub validator: Option<Validator>,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
            provider: None,
            validator: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach an async candidate provider.
    pub fn candidates<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Vec<Candidate>>> + 'static,
    {
        self.provider = Some(boxed_provider(provider));
        self
    }

    /// Attach a fixed candidate list.
    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider = Some(static_provider(
            values.into_iter().map(Candidate::new).collect(),
        ));
        self
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + 'static,
    {
        self.validator = Some(Rc::new(validator));
        self
    }
}

impl fmt::Debug for ArgumentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDef")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("provider", &self.provider.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Named option or flag.
#[derive(Clone)]
pub struct OptionDef {
    /// Long name without leading `--`
    pub name: String,
    /// Short name without leading `-`
    pub short: Option<char>,
    pub description: Option<String>,
    /// Whether the option consumes the following token
    pub takes_value: bool,
    pub provider: Option<CandidateProvider>,
    pub validator: Option<Validator>,
}

impl OptionDef {
    /// A value-taking option.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short: None,
            description: None,
            takes_value: true,
            provider: None,
            validator: None,
        }
    }

    /// A boolean flag.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            takes_value: false,
            ..Self::new(name)
        }
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn candidates<F, Fut>(mut self, provider: F) -> Self
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Vec<Candidate>>> + 'static,
    {
        self.provider = Some(boxed_provider(provider));
        self
    }

    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider = Some(static_provider(
            values.into_iter().map(Candidate::new).collect(),
        ));
        self
    }

    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + 'static,
    {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// True when `key` (dashes stripped) names this option.
    pub fn matches(&self, key: &str) -> bool {
        if self.name == key {
            return true;
        }
        let mut chars = key.chars();
        match (self.short, chars.next(), chars.next()) {
            (Some(short), Some(c), None) => short == c,
            _ => false,
        }
    }
}

impl fmt::Debug for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDef")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("takes_value", &self.takes_value)
            .finish()
    }
}

/// Full definition of a command and its subcommand tree.
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub long_description: Option<String>,
    pub arguments: Vec<ArgumentDef>,
    pub options: Vec<OptionDef>,
    pub subcommands: Vec<CommandDefinition>,
    pub disabled: Option<DisabledCheck>,
    pub executor: Option<Executor>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            long_description: None,
            arguments: Vec::new(),
            options: Vec::new(),
            subcommands: Vec::new(),
            disabled: None,
            executor: None,
        }
    }

    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn option(mut self, option: OptionDef) -> Self {
        self.options.push(option);
        self
    }

    pub fn subcommand(mut self, child: CommandDefinition) -> Self {
        self.subcommands.push(child);
        self
    }

    pub fn disabled_when<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.disabled = Some(Rc::new(check));
        self
    }

    pub fn execute<F, Fut>(mut self, body: F) -> Self
    where
        F: Fn(Invocation) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.executor = Some(Rc::new(move |inv| body(inv).boxed_local()));
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.as_ref().map(|check| check()).unwrap_or(false)
    }

    pub fn find_option(&self, key: &str) -> Option<&OptionDef> {
        self.options.iter().find(|opt| opt.matches(key))
    }

    /// Help text for the command registered under `id`.
    pub fn help_text(&self, id: &str) -> String {
        let mut usage = format!("Usage: {}", id.replace(':', " "));
        if self.subcommands.iter().any(|c| !c.is_disabled()) {
            usage.push_str(" <command>");
        }
        for arg in &self.arguments {
            if arg.required {
                usage.push_str(&format!(" <{}>", arg.name));
            } else {
                usage.push_str(&format!(" [{}]", arg.name));
            }
        }
        usage.push_str(" [options]");

        let mut out = vec![usage, String::new(), self.description.clone()];
        if let Some(long) = &self.long_description {
            out.push(String::new());
            out.push(long.clone());
        }

        let subcommands: Vec<_> = self
            .subcommands
            .iter()
            .filter(|c| !c.is_disabled())
            .map(|c| (c.name.clone(), c.description.clone()))
            .collect();
        push_section(&mut out, "Commands", subcommands);

        let arguments = self
            .arguments
            .iter()
            .map(|a| (a.name.clone(), a.description.clone().unwrap_or_default()))
            .collect();
        push_section(&mut out, "Arguments", arguments);

        let mut options: Vec<_> = self
            .options
            .iter()
            .map(|o| {
                let mut label = match o.short {
                    Some(short) => format!("-{short}, --{}", o.name),
                    None => format!("    --{}", o.name),
                };
                if o.takes_value {
                    label.push_str(" <value>");
                }
                (label, o.description.clone().unwrap_or_default())
            })
            .collect();
        options.push(("-h, --help".to_string(), "Show this help".to_string()));
        push_section(&mut out, "Options", options);

        out.join("\n")
    }
}

fn push_section(out: &mut Vec<String>, title: &str, rows: Vec<(String, String)>) {
    if rows.is_empty() {
        return;
    }
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    out.push(String::new());
    out.push(format!("{title}:"));
    for (label, description) in rows {
        out.push(format!("  {label:<width$}  {description}").trim_end().to_string());
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("options", &self.options)
            .field("subcommands", &self.subcommands)
            .field("executable", &self.executor.is_some())
            .finish()
    }
}

/// Value of a normalized option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag,
    Value(String),
}

/// Everything `execute` receives for one command context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Qualified registry id, e.g. `widgets:download`
    pub id: String,
    pub positional: Vec<String>,
    /// Options keyed by camel-cased long name
    pub options: BTreeMap<String, OptionValue>,
    /// Raw text of the command context
    pub line: String,
}

impl Invocation {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        match self.options.get(name) {
            Some(OptionValue::Value(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}
