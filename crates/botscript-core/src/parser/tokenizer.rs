//! BotScript tokenizer — converts program text into a lazy token stream
//!
//! Four token shapes, tried in this order after skipping whitespace:
//! `(name` opens a statement, `)` closes one, any run of characters other
//! than parentheses is a literal value, and end of input is `Eof`.
//!
//! Guarantees:
//! - Forward-only: tokens are produced on demand and never revisited
//! - No silent skipping: when nothing matches, `next_token` yields `None`
//!   without consuming input, and the caller must report it

use std::fmt;

/// Token types for BotScript syntax
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(name`, carrying the lowercased statement name
    Open(String),
    /// `)`
    Close,
    /// Raw literal text, trailing whitespace removed
    Value(String),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Open(name) => write!(f, "'({}'", name),
            Token::Close => write!(f, "')'"),
            Token::Value(text) => write!(f, "value '{}'", text),
            Token::Eof => write!(f, "end of file"),
        }
    }
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for BotScript source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    last_span: Span,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input text
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            last_span: Span {
                line: 1,
                column: 1,
                offset: 0,
            },
        }
    }

    /// Produce the next token.
    ///
    /// Returns `None` when no token pattern matches at the current offset.
    /// Input is not consumed in that case, so calling again yields `None`
    /// again; callers must treat it as malformed input.
    pub fn next_token(&mut self) -> Option<SpannedToken> {
        self.skip_whitespace();
        let span = self.current_span();
        self.last_span = span;

        let token = match self.peek() {
            None => Token::Eof,
            Some('(') => self.read_open()?,
            Some(')') => {
                self.advance();
                Token::Close
            }
            Some(_) => self.read_value(),
        };

        Some(SpannedToken { token, span })
    }

    /// Tokenize the entire input, ending with `Eof`
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            let Some(token) = self.next_token() else {
                return Err(self.unrecognized().into());
            };
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Position of the most recently attempted token
    pub fn last_span(&self) -> Span {
        self.last_span
    }

    /// Error describing the input the tokenizer could not match
    pub fn unrecognized(&self) -> crate::error::ParseError {
        let found: String = self.input[self.position..]
            .iter()
            .take(12)
            .collect();
        crate::error::ParseError::new(
            format!("unrecognized input '{}'", found.trim_end()),
            self.last_span,
        )
    }

    // ── Character helpers ──────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ── Token readers ──────────────────────────────────────

    /// `(` followed by optional whitespace and a name of letters/hyphens.
    /// Nothing is consumed unless the whole pattern matches.
    fn read_open(&mut self) -> Option<Token> {
        let mut lookahead = 1;
        while self.peek_ahead(lookahead).is_some_and(char::is_whitespace) {
            lookahead += 1;
        }
        let name_start = lookahead;
        while self
            .peek_ahead(lookahead)
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '-')
        {
            lookahead += 1;
        }
        if lookahead == name_start {
            return None;
        }

        let name: String = self.input[self.position + name_start..self.position + lookahead]
            .iter()
            .collect();
        for _ in 0..lookahead {
            self.advance();
        }
        Some(Token::Open(name.to_ascii_lowercase()))
    }

    fn read_value(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if ch == '(' || ch == ')' {
                break;
            }
            self.advance();
        }
        let text: String = self.input[start..self.position].iter().collect();
        Token::Value(text.trim_end().to_string())
    }
}
