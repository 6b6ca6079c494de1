use std::fmt;

use crate::lexer::{Token, TokenKind};

/// Contiguous run of tokens making up one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandContext {
    pub tokens: Vec<Token>,
}

impl CommandContext {
    /// Leading run of positional tokens, i.e. the words a resolver walks.
    pub fn leading_words(&self) -> Vec<String> {
        self.tokens
            .iter()
            .take_while(|t| t.is_positional())
            .map(Token::value)
            .collect()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// Names of every option key present, dashes stripped.
    pub fn option_names(&self) -> Vec<String> {
        self.tokens.iter().filter_map(Token::option_name).collect()
    }

    pub fn start(&self) -> usize {
        self.tokens.first().map(|t| t.start).unwrap_or(0)
    }

    pub fn end(&self) -> usize {
        self.tokens.last().map(|t| t.end).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    Context(CommandContext),
    Operator(Token),
}

/// Parsed line: command contexts separated by logical operators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineAst {
    pub nodes: Vec<AstNode>,
}

impl LineAst {
    pub fn contexts(&self) -> impl Iterator<Item = &CommandContext> {
        self.nodes.iter().filter_map(|node| match node {
            AstNode::Context(ctx) => Some(ctx),
            AstNode::Operator(_) => None,
        })
    }

    pub fn operators(&self) -> impl Iterator<Item = &Token> {
        self.nodes.iter().filter_map(|node| match node {
            AstNode::Operator(tok) => Some(tok),
            AstNode::Context(_) => None,
        })
    }

    pub fn last(&self) -> Option<&AstNode> {
        self.nodes.last()
    }

    pub fn has_contexts(&self) -> bool {
        self.contexts().next().is_some()
    }

    /// All tokens in line order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.nodes.iter().flat_map(|node| match node {
            AstNode::Context(ctx) => ctx.tokens.iter().collect::<Vec<_>>(),
            AstNode::Operator(tok) => vec![tok],
        })
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut nodes = Vec::new();
        let mut current = CommandContext::default();

        for token in tokens {
            if token.kind == TokenKind::LogicalOperator {
                if !current.tokens.is_empty() {
                    nodes.push(AstNode::Context(std::mem::take(&mut current)));
                }
                nodes.push(AstNode::Operator(token));
            } else {
                current.tokens.push(token);
            }
        }
        if !current.tokens.is_empty() {
            nodes.push(AstNode::Context(current));
        }

        Self { nodes }
    }
}

/// Renders the raw token texts joined by single spaces.
impl fmt::Display for LineAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&token.text)?;
        }
        Ok(())
    }
}
