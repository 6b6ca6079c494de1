#![doc = "Command-line parser turning raw operator input into a command AST."]

pub mod ast;
pub mod lexer;

pub use ast::{AstNode, CommandContext, LineAst};
pub use lexer::{quote, unquote, Connective, OptionStyle, Token, TokenKind};

/// Parse a raw line. Total: any input, including an empty line, yields an AST.
pub fn parse(line: &str) -> LineAst {
    LineAst::from_tokens(lexer::tokenize(line))
}
