//! Context-sensitive completion: what can legally follow the text typed so far.

use std::rc::Rc;

use opsh_parser::{parse, AstNode, OptionStyle, Token, TokenKind};
use tracing::debug;

use crate::definition::{Candidate, CandidateProvider, CommandDefinition};
use crate::error::CompletionError;
use crate::registry::{Registry, Resolution};

/// Kind of slot the cursor is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Positional,
    OptionKey,
    OptionValue,
}

/// Completion engine over a shared registry.
#[derive(Debug, Clone)]
pub struct CompletionEngine {
    registry: Rc<Registry>,
}

impl CompletionEngine {
    pub fn new(registry: Rc<Registry>) -> Self {
        Self { registry }
    }

    /// Candidates for the end of `line`.
    ///
    /// Provider failures come back as [`CompletionError::Provider`]; nothing
    /// here panics on malformed input.
    pub async fn complete(&self, line: &str) -> Result<Vec<Candidate>, CompletionError> {
        let ast = parse(line);
        // A token still being typed (even an open quoted run) reaches the end of the line.
        let fresh = ast.tokens().last().map_or(true, |t| t.end < line.len());

        if !ast.has_contexts() {
            return Ok(self.registry.top_level());
        }

        let ctx = match ast.last() {
            Some(AstNode::Operator(op)) => {
                return Ok(if fresh {
                    self.registry.top_level()
                } else {
                    vec![Candidate::new(&op.text)]
                });
            }
            Some(AstNode::Context(ctx)) => ctx,
            None => return Ok(Vec::new()),
        };

        let (committed, typing): (&[Token], Option<&Token>) = if fresh {
            (&ctx.tokens, None)
        } else {
            match ctx.tokens.split_last() {
                Some((last, rest)) => (rest, Some(last)),
                None => (&[], None),
            }
        };
        let prefix = typing.map(Token::value).unwrap_or_default();

        let words: Vec<String> = committed
            .iter()
            .take_while(|t| t.is_positional())
            .map(Token::value)
            .collect();
        if words.is_empty() {
            return Ok(filter(self.registry.top_level(), &prefix));
        }

        let Ok(anchor) = self.registry.resolve(&words) else {
            debug!(?words, "no anchor definition");
            return Ok(Vec::new());
        };
        let def = &anchor.definition;

        match slot(def, committed, typing) {
            Slot::Positional => self.complete_positional(line, &anchor, committed, &prefix).await,
            Slot::OptionKey => Ok(complete_option_key(def, committed, typing)),
            Slot::OptionValue => {
                let Some(key) = committed.last().and_then(Token::option_name) else {
                    return Ok(Vec::new());
                };
                let Some(option) = def.find_option(&key) else {
                    return Ok(Vec::new());
                };
                run_provider(option.provider.as_ref(), line, &format!("--{}", option.name), &prefix)
                    .await
            }
        }
    }

    async fn complete_positional(
        &self,
        line: &str,
        anchor: &Resolution,
        committed: &[Token],
        prefix: &str,
    ) -> Result<Vec<Candidate>, CompletionError> {
        let subcommands = self.registry.subcommands(&anchor.id);
        if !subcommands.is_empty() {
            return Ok(filter(subcommands, prefix));
        }

        let index = positional_count(&anchor.definition, &committed[anchor.depth..]);
        let Some(argument) = anchor.definition.arguments.get(index) else {
            return Ok(Vec::new());
        };
        debug!(id = %anchor.id, argument = %argument.name, index, "completing argument");
        run_provider(argument.provider.as_ref(), line, &format!("<{}>", argument.name), prefix).await
    }
}

/// Decide which slot the cursor sits in.
fn slot(def: &CommandDefinition, committed: &[Token], typing: Option<&Token>) -> Slot {
    match typing {
        Some(token) => match token.kind {
            TokenKind::CommandOptionKey => Slot::OptionKey,
            TokenKind::CommandOptionValue if owner_takes_value(def, committed.last()) => {
                Slot::OptionValue
            }
            _ => Slot::Positional,
        },
        None => match committed.last() {
            Some(last) if last.kind == TokenKind::CommandOptionKey => {
                if owner_takes_value(def, Some(last)) {
                    Slot::OptionValue
                } else {
                    Slot::Positional
                }
            }
            _ => Slot::Positional,
        },
    }
}

/// True unless `key` names a known flag. Unknown keys are assumed to take a value.
fn owner_takes_value(def: &CommandDefinition, key: Option<&Token>) -> bool {
    let Some(name) = key.and_then(Token::option_name) else {
        return false;
    };
    def.find_option(&name).map(|opt| opt.takes_value).unwrap_or(true)
}

/// Positional tokens after the anchor, counting values that trail a flag.
fn positional_count(def: &CommandDefinition, rest: &[Token]) -> usize {
    let mut count = 0;
    let mut prev: Option<&Token> = None;
    for token in rest {
        match token.kind {
            TokenKind::CommandInvocation | TokenKind::CommandArgument => count += 1,
            TokenKind::CommandOptionValue if !owner_takes_value(def, prev) => count += 1,
            _ => {}
        }
        prev = Some(token);
    }
    count
}

fn complete_option_key(
    def: &CommandDefinition,
    committed: &[Token],
    typing: Option<&Token>,
) -> Vec<Candidate> {
    let present: Vec<String> = committed.iter().filter_map(Token::option_name).collect();
    let typed = typing.map(Token::value).unwrap_or_default();
    let typed_short = match typing.and_then(|t| t.option_style) {
        Some(OptionStyle::Short) => {
            let mut chars = typed.trim_start_matches('-').chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        }
        _ => None,
    };

    let mut candidates: Vec<(Candidate, Option<char>)> = def
        .options
        .iter()
        .filter(|opt| !present.iter().any(|p| opt.matches(p)))
        .map(|opt| {
            let candidate = Candidate::new(format!("--{}", opt.name));
            let candidate = match &opt.description {
                Some(d) => candidate.with_description(d),
                None => candidate,
            };
            (candidate, opt.short)
        })
        .collect();

    let help_defined = def.find_option("help").is_some();
    let help_present = present.iter().any(|p| p == "help" || p == "h");
    if !help_defined && !help_present {
        candidates.push((
            Candidate::new("--help").with_description("Show help"),
            Some('h'),
        ));
    }

    candidates
        .into_iter()
        .filter(|(candidate, short)| {
            candidate.value.starts_with(&typed) || (typed_short.is_some() && *short == typed_short)
        })
        .map(|(candidate, _)| candidate)
        .collect()
}

async fn run_provider(
    provider: Option<&CandidateProvider>,
    line: &str,
    target: &str,
    prefix: &str,
) -> Result<Vec<Candidate>, CompletionError> {
    let Some(provider) = provider else {
        return Ok(Vec::new());
    };
    let candidates = provider(line.to_string())
        .await
        .map_err(|source| CompletionError::Provider {
            target: target.to_string(),
            source,
        })?;
    Ok(filter(candidates, prefix))
}

fn filter(candidates: Vec<Candidate>, prefix: &str) -> Vec<Candidate> {
    if prefix.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| c.value.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;

    use super::*;
    use crate::definition::{ArgumentDef, OptionDef};

    fn values(candidates: Vec<Candidate>) -> Vec<String> {
        candidates.into_iter().map(|c| c.value).collect()
    }

    fn engine() -> CompletionEngine {
        let mut registry = Registry::new();
        registry
            .register(
                CommandDefinition::new("widgets", "Manage widgets")
                    .subcommand(CommandDefinition::new("list", "List widgets"))
                    .subcommand(
                        CommandDefinition::new("download", "Download a widget")
                            .argument(ArgumentDef::new("id").choices(["abc", "abd", "xyz"]))
                            .argument(ArgumentDef::new("dest").choices(["./out"]))
                            .option(OptionDef::new("site").short('s').choices(["siteUS", "siteEU"]))
                            .option(OptionDef::flag("force").short('f')),
                    ),
            )
            .unwrap();
        registry
            .register(CommandDefinition::new("themes", "Manage themes"))
            .unwrap();
        registry
            .register(CommandDefinition::new("secret", "Hidden").disabled_when(|| true))
            .unwrap();
        registry
            .register(
                CommandDefinition::new("broken", "Provider fails").argument(
                    ArgumentDef::new("x").candidates(|_line| async { Err(anyhow::anyhow!("offline")) }),
                ),
            )
            .unwrap();
        CompletionEngine::new(Rc::new(registry))
    }

    fn complete(line: &str) -> Vec<String> {
        values(block_on(engine().complete(line)).unwrap())
    }

    #[test]
    fn test_empty_line_lists_enabled_top_level() {
        assert_eq!(complete(""), vec!["widgets", "themes", "broken"]);
    }

    #[test]
    fn test_prefix_of_first_word() {
        assert_eq!(complete("wid"), vec!["widgets"]);
        assert_eq!(complete("sec"), Vec::<String>::new());
    }

    #[test]
    fn test_subcommand_prefix() {
        assert_eq!(complete("widgets li"), vec!["list"]);
        assert_eq!(complete("widgets "), vec!["list", "download"]);
    }

    #[test]
    fn test_logical_operator() {
        assert_eq!(complete("widgets list &&"), vec!["&&"]);
        assert_eq!(complete("widgets list || "), vec!["widgets", "themes", "broken"]);
    }

    #[test]
    fn test_argument_providers_by_position() {
        assert_eq!(complete("widgets download "), vec!["abc", "abd", "xyz"]);
        assert_eq!(complete("widgets download ab"), vec!["abc", "abd"]);
        assert_eq!(complete("widgets download abc "), vec!["./out"]);
        assert_eq!(complete("widgets download abc ./out "), Vec::<String>::new());
    }

    #[test]
    fn test_argument_index_skips_options() {
        assert_eq!(complete("widgets download --site siteUS "), vec!["abc", "abd", "xyz"]);
        assert_eq!(complete("widgets download --force abc "), vec!["./out"]);
    }

    #[test]
    fn test_option_keys() {
        assert_eq!(complete("widgets download --"), vec!["--site", "--force", "--help"]);
        assert_eq!(complete("widgets download --s"), vec!["--site"]);
        assert_eq!(complete("widgets download -f"), vec!["--force"]);
        assert_eq!(
            complete("widgets download --site siteUS --"),
            vec!["--force", "--help"]
        );
    }

    #[test]
    fn test_option_values() {
        assert_eq!(complete("widgets download --site "), vec!["siteUS", "siteEU"]);
        assert_eq!(complete("widgets download -s siteE"), vec!["siteEU"]);
        assert_eq!(complete("widgets download --unknown "), Vec::<String>::new());
    }

    #[test]
    fn test_unknown_anchor_yields_nothing() {
        assert!(complete("gadgets ").is_empty());
        assert!(complete("secret ").is_empty());
    }

    #[test]
    fn test_provider_error_is_wrapped() {
        let err = block_on(engine().complete("broken ")).unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert!(err.to_string().contains("<x>"));
    }

    #[test]
    fn test_provider_receives_line() {
        let seen = Rc::new(std::cell::RefCell::new(String::new()));
        let sink = seen.clone();
        let mut registry = Registry::new();
        registry
            .register(CommandDefinition::new("echo", "").argument(
                ArgumentDef::new("text").candidates(move |line| {
                    *sink.borrow_mut() = line;
                    async { Ok(vec![Candidate::new("hi")]) }
                }),
            ))
            .unwrap();
        let engine = CompletionEngine::new(Rc::new(registry));
        assert_eq!(values(block_on(engine.complete("echo h")).unwrap()), vec!["hi"]);
        assert_eq!(seen.borrow().as_str(), "echo h");
    }

    #[test]
    fn test_disabled_subcommands_are_hidden() {
        let enabled = Rc::new(Cell::new(false));
        let flag = enabled.clone();
        let mut registry = Registry::new();
        registry
            .register(
                CommandDefinition::new("sites", "")
                    .subcommand(CommandDefinition::new("list", ""))
                    .subcommand(CommandDefinition::new("delete", "").disabled_when(move || !flag.get())),
            )
            .unwrap();
        let engine = CompletionEngine::new(Rc::new(registry));
        assert_eq!(values(block_on(engine.complete("sites ")).unwrap()), vec!["list"]);
        enabled.set(true);
        assert_eq!(
            values(block_on(engine.complete("sites ")).unwrap()),
            vec!["list", "delete"]
        );
    }
}
