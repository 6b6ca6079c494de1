//! Space-delimited tokenizer for operator command lines.
//!
//! Lines are split on literal spaces only. A double quote opens a run in which
//! spaces do not split; inside that run `\"` and `\\` are escapes. Tokens keep
//! their raw text so offsets always line up with the input.

/// Classification of a token within its command context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `&&` or `||`
    LogicalOperator,
    /// Command name or subcommand name
    CommandInvocation,
    /// Positional argument
    CommandArgument,
    /// `--name` or `-n`
    CommandOptionKey,
    /// Value following an option key
    CommandOptionValue,
}

/// Spelling of an option key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionStyle {
    /// `--name`
    Full,
    /// `-n`
    Short,
}

/// Logical connective between two command contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    /// `&&`: run the next context only on success
    And,
    /// `||`: run the next context only on failure
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub kind: TokenKind,
    /// Raw text exactly as typed, quotes included.
    pub text: String,
    pub option_style: Option<OptionStyle>,
}

impl Token {
    /// Unquoted value of the token.
    pub fn value(&self) -> String {
        unquote(&self.text)
    }

    /// Option name with leading dashes removed, for option keys.
    pub fn option_name(&self) -> Option<String> {
        match self.kind {
            TokenKind::CommandOptionKey => Some(self.value().trim_start_matches('-').to_string()),
            _ => None,
        }
    }

    pub fn connective(&self) -> Option<Connective> {
        match (self.kind, self.text.as_str()) {
            (TokenKind::LogicalOperator, "&&") => Some(Connective::And),
            (TokenKind::LogicalOperator, "||") => Some(Connective::Or),
            _ => None,
        }
    }

    /// True for tokens that occupy a positional slot.
    pub fn is_positional(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::CommandInvocation | TokenKind::CommandArgument
        )
    }
}

/// A raw space-delimited piece of the line before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Split a line into raw pieces. Runs of spaces produce no pieces but still
/// advance the offset.
pub fn split(line: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch == ' ' {
            chars.next();
            continue;
        }

        let mut in_quote = false;
        let mut end = line.len();
        while let Some(&(idx, ch)) = chars.peek() {
            match ch {
                ' ' if !in_quote => {
                    end = idx;
                    break;
                }
                '"' => in_quote = !in_quote,
                '\\' if in_quote => {
                    // Consume the escaped character along with the backslash.
                    chars.next();
                }
                _ => {}
            }
            chars.next();
        }

        pieces.push(Piece {
            start,
            end,
            text: &line[start..end],
        });
    }

    pieces
}

/// Tokenize and classify a whole line.
///
/// Classification only looks at the current piece and the token before it
/// in the same command context.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut prev: Option<TokenKind> = None;

    for piece in split(line) {
        let kind = classify(piece.text, prev);
        let option_style = match kind {
            TokenKind::CommandOptionKey if piece.text.starts_with("--") => Some(OptionStyle::Full),
            TokenKind::CommandOptionKey => Some(OptionStyle::Short),
            _ => None,
        };

        #[cfg(feature = "debug_parse")]
        tracing::trace!(text = piece.text, ?kind, start = piece.start, "classified token");

        tokens.push(Token {
            start: piece.start,
            end: piece.end,
            kind,
            text: piece.text.to_string(),
            option_style,
        });
        prev = Some(kind);
    }

    tokens
}

fn classify(text: &str, prev: Option<TokenKind>) -> TokenKind {
    if text == "&&" || text == "||" {
        return TokenKind::LogicalOperator;
    }
    match prev {
        None | Some(TokenKind::LogicalOperator) => TokenKind::CommandInvocation,
        _ if text.starts_with('-') => TokenKind::CommandOptionKey,
        Some(TokenKind::CommandOptionKey) => TokenKind::CommandOptionValue,
        Some(TokenKind::CommandInvocation) => TokenKind::CommandInvocation,
        _ => TokenKind::CommandArgument,
    }
}

/// Strip quoting from raw token text.
pub fn unquote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_quote = false;
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quote = !in_quote,
            '\\' if in_quote => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Quote a value so it survives [`split`] as a single piece with
/// [`unquote`] returning it unchanged.
pub fn quote(value: &str) -> String {
    if value.is_empty() {
        return "\"\"".to_string();
    }
    if !value.contains([' ', '"', '\\']) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
