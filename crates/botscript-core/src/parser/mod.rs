//! BotScript parser — tokenizer plus stack-driven builder
//!
//! Converts program text into a sealed root [`Command`]. Nesting is handled
//! with an explicit stack of nodes under construction instead of recursive
//! descent, so depth is bounded by memory, not by the call stack.
//!
//! For each token:
//! - `(name`: create the named node and push it;
//! - `)`: pop and seal the top node, then attach it to the new top, or
//!   keep it as the finished root when the stack is empty;
//! - literal: attach the value to the top node;
//! - end of file: the stack must be empty.

pub mod tokenizer;

use tracing::debug;

use crate::ast::{Command, StatementKind};
use crate::builder::{Attachment, StatementBuilder};
use crate::error::ParseError;
use crate::Result;
use tokenizer::{Span, SpannedToken, Token, Tokenizer};

/// Parse program text into its root command
///
/// # Errors
/// Returns `ParseError` with the position of the offending token for any
/// malformed input. There is no partial recovery.
///
/// # Example
/// ```
/// let program = botscript_core::parser::parse("(seq (move) (turn clockwise))")?;
/// assert_eq!(program.to_string(), "(seq (move) (turn clockwise))");
/// # Ok::<(), botscript_core::Error>(())
/// ```
pub fn parse(input: &str) -> Result<Command> {
    Parser::new(input).parse()
}

/// A node under construction and where it was opened
struct Frame {
    builder: StatementBuilder,
    span: Span,
}

struct Parser {
    tokenizer: Tokenizer,
    stack: Vec<Frame>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            tokenizer: Tokenizer::new(input),
            stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Command> {
        let first = self.next()?;
        let root = match first.token {
            Token::Open(name) => self.open(&name, first.span)?,
            other => {
                return Err(ParseError::new(
                    format!("a program must start with '(', found {}", other),
                    first.span,
                )
                .into())
            }
        };
        if !root.kind().is_command() {
            return Err(ParseError::new(
                format!(
                    "a program's root must be an action, not a condition ({})",
                    root.kind()
                ),
                first.span,
            )
            .into());
        }
        self.stack.push(Frame {
            builder: root,
            span: first.span,
        });

        let mut finished: Option<Command> = None;
        loop {
            let SpannedToken { token, span } = self.next()?;
            match token {
                Token::Open(name) => {
                    if finished.is_some() {
                        return Err(trailing(&Token::Open(name), span));
                    }
                    let builder = self.open(&name, span)?;
                    debug!(statement = %builder.kind(), depth = self.stack.len(), "open");
                    self.stack.push(Frame { builder, span });
                }
                Token::Close => {
                    let Some(frame) = self.stack.pop() else {
                        return Err(ParseError::new("unbalanced ')'", span).into());
                    };
                    let kind = frame.builder.kind();
                    let statement = frame.builder.finish().map_err(|e| {
                        ParseError::new(
                            format!("{} (opened at {})", e, frame.span),
                            span,
                        )
                    })?;

                    match self.stack.last_mut() {
                        Some(parent) => {
                            let attachment = Attachment::Statement(statement);
                            attach(&mut parent.builder, attachment, span)?;
                        }
                        None => {
                            let command = statement.into_command().ok_or_else(|| {
                                ParseError::new(
                                    format!("a program's root must be an action, not ({})", kind),
                                    span,
                                )
                            })?;
                            finished = Some(command);
                        }
                    }
                }
                Token::Value(text) => {
                    let Some(top) = self.stack.last_mut() else {
                        return Err(trailing(&Token::Value(text), span));
                    };
                    attach(&mut top.builder, Attachment::Value(text), span)?;
                }
                Token::Eof => {
                    if let Some(frame) = self.stack.last() {
                        return Err(ParseError::new(
                            format!(
                                "unexpected end of file: ({}) opened at {} is not closed",
                                frame.builder.kind(),
                                frame.span
                            ),
                            span,
                        )
                        .into());
                    }
                    break;
                }
            }
        }

        // the stack only empties by popping the root, which sets `finished`
        let root = finished.ok_or_else(|| ParseError::new("empty program", Span::default()))?;
        debug!(statement = %root.kind(), "parsed");
        Ok(root)
    }

    fn next(&mut self) -> Result<SpannedToken> {
        self.tokenizer
            .next_token()
            .ok_or_else(|| self.tokenizer.unrecognized().into())
    }

    fn open(&self, name: &str, span: Span) -> Result<StatementBuilder> {
        StatementKind::from_name(name)
            .map(StatementBuilder::new)
            .ok_or_else(|| ParseError::new(format!("unknown statement '{}'", name), span).into())
    }
}

fn attach(builder: &mut StatementBuilder, attachment: Attachment, span: Span) -> Result<()> {
    if !builder.can_attach(&attachment) {
        return Err(ParseError::new(
            format!("({}) does not accept {} here", builder.kind(), attachment),
            span,
        )
        .into());
    }
    builder
        .attach(attachment)
        .map_err(|e| ParseError::new(e.to_string(), span).into())
}

fn trailing(token: &Token, span: Span) -> crate::Error {
    ParseError::new(
        format!("unexpected {} after the end of the program", token),
        span,
    )
    .into()
}
