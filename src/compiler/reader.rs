//! Pure token cursor over the lexer.
//!
//! Single-token lookahead, no diagnostics: expectation checks and error
//! reporting live in the compiler driver. The reader tracks the previously
//! consumed token so error ranges can extend to "the last thing read".

use std::collections::VecDeque;

use crate::diagnostics::{Diagnostic, SourcePosition};
use crate::lexer::{Lexer, Token, TokenKind};

pub struct TokenReader<'src> {
    lexer: Lexer<'src>,
    lookahead: VecDeque<Token>,
    prev: Option<Token>,
}

impl<'src> TokenReader<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
            lookahead: VecDeque::new(),
            prev: None,
        }
    }

    fn fill(&mut self) {
        if self.lookahead.is_empty() {
            if let Some(token) = self.lexer.next() {
                self.lookahead.push_back(token);
            }
        }
    }

    pub fn peek(&mut self) -> Option<&Token> {
        self.fill();
        self.lookahead.front()
    }

    pub fn peek_kind(&mut self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub fn next(&mut self) -> Option<Token> {
        self.fill();
        let token = self.lookahead.pop_front()?;
        self.prev = Some(token.clone());
        Some(token)
    }

    /// Consume the next token only if it has `kind`.
    pub fn take(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek_kind() == Some(kind) {
            self.next()
        } else {
            None
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    /// The most recently consumed token.
    pub fn prev_token(&self) -> Option<&Token> {
        self.prev.as_ref()
    }

    /// Position just past the final character, for end-of-input reports.
    pub fn end_position(&self) -> SourcePosition {
        self.lexer.end_position()
    }

    /// Diagnostics the lexer produced while tokens were being pulled.
    pub fn take_lexer_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.lexer.take_diagnostics()
    }
}
