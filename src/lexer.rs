//!
//! # Patter Lexer
//!
//! Single-pass scanner that turns raw source text into a flat token stream.
//! The scanner is hand-rolled rather than table-driven because several rules
//! are context-local and positional:
//!
//! - Whitespace is queued, then either emitted as a single `Whitespace` token
//!   or suppressed entirely (at line starts, before line breaks, and before
//!   comments). Line breaks themselves are folded into ordinary text.
//! - Plain text accumulates across cycles and is flushed lazily, immediately
//!   before the next non-text token is emitted and once more at end of input,
//!   so emitted tokens always appear in source order.
//! - Escapes, verbatim strings, and regex literals are scanned inline and
//!   carry their own truncation and malformation errors.
//!
//! All offsets are byte offsets into the source. Each token records the line
//! number and the byte offset of that line's start so that diagnostics can
//! derive a column without rescanning the source.
//!
//! The lexer never fails: errors are reported through an internal diagnostic
//! list (drained via [`Lexer::take_diagnostics`]) and scanning either skips
//! the offending character or, for constructs truncated at end of input,
//! stops producing tokens altogether.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, ErrorKind, SourcePosition};
use crate::syntax::Span;

// ============================================================================
// TOKENS
// ============================================================================

/// Every lexeme class the scanner can produce.
///
/// Structural punctuation gets a dedicated kind so the parser can match on it
/// directly; everything else is folded into `Text`, `Whitespace`, or one of
/// the literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// `[` opens a tag (function call, subroutine, or replacer).
    LeftSquare,
    /// `]` closes a tag or a subroutine body.
    RightSquare,
    /// `{` opens a block.
    LeftCurly,
    /// `}` closes a block.
    RightCurly,
    /// `<` opens a query (reserved; currently lexed but parsed as text).
    LeftAngle,
    /// `>` closes a query.
    RightAngle,
    /// `|` separates block elements.
    Pipe,
    /// `;` separates tag arguments.
    Semicolon,
    /// `:` introduces argument lists and subroutine bodies.
    Colon,
    /// `::` introduces a synchronizer.
    DoubleColon,
    /// `@` marks loose (uninterpreted) parameters and arguments.
    At,
    /// `?` marks a query as a match.
    Question,
    /// `?!` marks a query as a negated match.
    Without,
    /// `$` introduces a subroutine definition or call.
    Dollar,
    /// `=` assigns a carrier or match.
    Equal,
    /// `&` marks a carrier component.
    Ampersand,
    /// `-` negates or ranges a class filter.
    Hyphen,
    /// `!` negates a filter.
    Exclamation,
    /// `(` opens a grouping.
    LeftParen,
    /// `)` closes a grouping.
    RightParen,
    /// `+` joins query carriers.
    Plus,
    /// `.` selects a subtype or module member.
    Period,
    /// A run of literal text.
    Text,
    /// A run of blank characters within a line.
    Whitespace,
    /// `\x` escape; value holds everything after the backslash.
    EscapeSequenceChar,
    /// `\uXXXX` escape; value holds everything after the backslash.
    EscapeSequenceUnicode,
    /// `\UXXXXXXXX` escape for code points beyond the basic plane.
    EscapeSequenceSurrogatePair,
    /// `` ` ``-delimited regex literal; value holds the pattern body.
    Regex,
    /// Letter run immediately following a regex literal.
    RegexFlags,
}

impl TokenKind {
    /// Human-readable description used in "expected X, found Y" messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::LeftSquare => "opening bracket '['",
            TokenKind::RightSquare => "closing bracket ']'",
            TokenKind::LeftCurly => "opening brace '{'",
            TokenKind::RightCurly => "closing brace '}'",
            TokenKind::LeftAngle => "opening angle bracket '<'",
            TokenKind::RightAngle => "closing angle bracket '>'",
            TokenKind::Pipe => "element separator '|'",
            TokenKind::Semicolon => "argument separator ';'",
            TokenKind::Colon => "colon ':'",
            TokenKind::DoubleColon => "double colon '::'",
            TokenKind::At => "at sign '@'",
            TokenKind::Question => "question mark '?'",
            TokenKind::Without => "negated match '?!'",
            TokenKind::Dollar => "dollar sign '$'",
            TokenKind::Equal => "equals sign '='",
            TokenKind::Ampersand => "ampersand '&'",
            TokenKind::Hyphen => "hyphen '-'",
            TokenKind::Exclamation => "exclamation mark '!'",
            TokenKind::LeftParen => "opening parenthesis '('",
            TokenKind::RightParen => "closing parenthesis ')'",
            TokenKind::Plus => "plus sign '+'",
            TokenKind::Period => "period '.'",
            TokenKind::Text => "text",
            TokenKind::Whitespace => "whitespace",
            TokenKind::EscapeSequenceChar => "escape sequence",
            TokenKind::EscapeSequenceUnicode => "unicode escape sequence",
            TokenKind::EscapeSequenceSurrogatePair => "unicode escape sequence",
            TokenKind::Regex => "regex literal",
            TokenKind::RegexFlags => "regex flags",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single lexeme with full positional bookkeeping.
///
/// `index..end` is the byte range the token was scanned from. For text and
/// whitespace the value equals the covered source slice; for escapes the
/// value is the raw material after the backslash; for regex literals it is
/// the pattern body without the surrounding backticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line number of the token's first character.
    pub line: usize,
    /// Byte offset at which that line begins.
    pub line_start_offset: usize,
    /// Byte offset of the token's first character.
    pub index: usize,
    /// Byte offset one past the token's last character.
    pub end: usize,
    pub value: String,
}

impl Token {
    /// 0-based column of the token's first character on its line.
    pub fn column(&self) -> usize {
        self.index.saturating_sub(self.line_start_offset)
    }

    pub fn span(&self) -> Span {
        Span::new(self.index, self.end)
    }

    /// Position record for diagnostics pointing at this token.
    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(
            self.line,
            self.line_start_offset,
            self.index,
            self.end - self.index,
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

// ============================================================================
// LEXER
// ============================================================================

/// Lazy scanner over a source string.
///
/// Implements `Iterator<Item = Token>`; one call to `next` may scan several
/// characters (queued whitespace, comments) and one scan cycle may ready more
/// than one token (a text flush followed by the token that forced it), so
/// ready tokens are staged in an internal queue.
pub struct Lexer<'src> {
    src: &'src str,
    /// Byte offset of the next character to examine.
    pos: usize,
    /// 1-based line of `pos`.
    line: usize,
    /// Byte offset at which the current line begins.
    line_start: usize,
    /// True until the current line sees its first non-blank character.
    at_line_start: bool,

    // Queued whitespace run, undecided until the next significant character.
    white_start: usize,
    white_len: usize,

    // Pending text buffer with the position of its first character.
    text: String,
    text_start: usize,
    text_end: usize,
    text_line: usize,
    text_line_start: usize,

    ready: VecDeque<Token>,
    /// Set at end of input or after an unrecoverable truncation error.
    finished: bool,
    diagnostics: Vec<Diagnostic>,
}

/// Scan an entire source string up front.
///
/// Convenience for tooling and tests; the compiler itself consumes the lexer
/// lazily through its token reader.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    (tokens, lexer.take_diagnostics())
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            line_start: 0,
            at_line_start: true,
            white_start: 0,
            white_len: 0,
            text: String::new(),
            text_start: 0,
            text_end: 0,
            text_line: 1,
            text_line_start: 0,
            ready: VecDeque::new(),
            finished: false,
            diagnostics: Vec::new(),
        }
    }

    /// Remove and return all diagnostics reported so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Position record pointing just past the last character.
    pub fn end_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.line_start, self.src.len(), 0)
    }

    // ==== CURSOR ====

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    /// True if at least `n` characters remain, counting the current one.
    fn has_chars(&self, n: usize) -> bool {
        self.src[self.pos..].chars().take(n).count() == n
    }

    /// Consume one character, maintaining line bookkeeping.
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(ch)
    }

    // ==== EMISSION ====

    /// Stamp the text buffer's start position if it is currently empty.
    fn start_text(&mut self, index: usize) {
        if self.text.is_empty() {
            self.text_start = index;
            self.text_line = self.line;
            self.text_line_start = self.line_start;
        }
    }

    /// Emit the pending text buffer, if any.
    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let token = Token {
            kind: TokenKind::Text,
            line: self.text_line,
            line_start_offset: self.text_line_start,
            index: self.text_start,
            end: self.text_end,
            value: std::mem::take(&mut self.text),
        };
        self.ready.push_back(token);
    }

    /// Queue a non-text token, flushing pending text first so the stream
    /// stays in source order.
    fn emit_at(
        &mut self,
        kind: TokenKind,
        line: usize,
        line_start: usize,
        index: usize,
        end: usize,
        value: String,
    ) {
        self.flush_text();
        self.ready.push_back(Token {
            kind,
            line,
            line_start_offset: line_start,
            index,
            end,
            value,
        });
    }

    /// Queue a token whose first character is at the cursor's current line.
    fn emit(&mut self, kind: TokenKind, index: usize, end: usize, value: String) {
        self.emit_at(kind, self.line, self.line_start, index, end, value);
    }

    fn report(&mut self, kind: ErrorKind, index: usize, length: usize) {
        self.report_on_line(kind, self.line, self.line_start, index, length);
    }

    fn report_on_line(
        &mut self,
        kind: ErrorKind,
        line: usize,
        line_start: usize,
        index: usize,
        length: usize,
    ) {
        self.diagnostics.push(Diagnostic::error(
            kind,
            SourcePosition::new(line, line_start, index, length),
        ));
    }

    /// Stop producing tokens. Buffered text is intentionally not flushed:
    /// input truncated inside a construct has no trustworthy tail.
    fn abort(&mut self) {
        self.finished = true;
    }

    // ==== SCAN CYCLES ====

    /// Process characters until at least one token is ready or input ends.
    fn scan_cycle(&mut self) {
        let Some(c) = self.peek() else {
            // End of input: queued whitespace is dropped, text is flushed.
            self.white_len = 0;
            self.flush_text();
            self.finished = true;
            return;
        };
        let idx = self.pos;

        // Blank characters within a line are queued until the scanner knows
        // whether they precede something worth separating.
        if c.is_whitespace() && c != '\n' && c != '\r' {
            if self.white_len == 0 {
                self.white_start = idx;
            }
            self.white_len += c.len_utf8();
            self.bump();
            return;
        }

        // Decide the queued run's fate: suppressed at line starts and before
        // line breaks or comments, emitted as one token otherwise.
        if self.white_len > 0 {
            if !self.at_line_start && c != '\n' && c != '\r' && c != '#' {
                let start = self.white_start;
                let end = start + self.white_len;
                let value = self.src[start..end].to_string();
                self.emit(TokenKind::Whitespace, start, end, value);
            }
            self.white_len = 0;
        }

        let was_line_start = self.at_line_start;
        self.at_line_start = false;

        match c {
            // Comments run to end of line and produce nothing; the newline
            // itself is left for the next cycle.
            '#' => {
                self.bump();
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.bump();
                }
                self.at_line_start = was_line_start;
            }
            '\n' => {
                self.start_text(idx);
                self.bump();
                self.text.push('\n');
                self.text_end = self.pos;
                self.at_line_start = true;
            }
            '\r' => {
                self.start_text(idx);
                self.bump();
                self.text.push('\r');
                self.text_end = self.pos;
            }
            '\\' => self.scan_escape(idx),
            '"' => self.scan_verbatim(idx),
            '`' => self.scan_regex(idx),
            '?' => {
                if self.peek_second() == Some('!') {
                    self.emit(TokenKind::Without, idx, idx + 2, "?!".into());
                    self.bump();
                    self.bump();
                } else {
                    self.punct(TokenKind::Question, idx, c);
                }
            }
            ':' => {
                if self.peek_second() == Some(':') {
                    self.emit(TokenKind::DoubleColon, idx, idx + 2, "::".into());
                    self.bump();
                    self.bump();
                } else {
                    self.punct(TokenKind::Colon, idx, c);
                }
            }
            '[' => self.punct(TokenKind::LeftSquare, idx, c),
            ']' => self.punct(TokenKind::RightSquare, idx, c),
            '{' => self.punct(TokenKind::LeftCurly, idx, c),
            '}' => self.punct(TokenKind::RightCurly, idx, c),
            '<' => self.punct(TokenKind::LeftAngle, idx, c),
            '>' => self.punct(TokenKind::RightAngle, idx, c),
            '|' => self.punct(TokenKind::Pipe, idx, c),
            ';' => self.punct(TokenKind::Semicolon, idx, c),
            '@' => self.punct(TokenKind::At, idx, c),
            '$' => self.punct(TokenKind::Dollar, idx, c),
            '=' => self.punct(TokenKind::Equal, idx, c),
            '&' => self.punct(TokenKind::Ampersand, idx, c),
            '-' => self.punct(TokenKind::Hyphen, idx, c),
            '!' => self.punct(TokenKind::Exclamation, idx, c),
            '(' => self.punct(TokenKind::LeftParen, idx, c),
            ')' => self.punct(TokenKind::RightParen, idx, c),
            '+' => self.punct(TokenKind::Plus, idx, c),
            '.' => self.punct(TokenKind::Period, idx, c),
            _ => {
                self.start_text(idx);
                self.bump();
                self.text.push(c);
                self.text_end = self.pos;
            }
        }
    }

    fn punct(&mut self, kind: TokenKind, idx: usize, c: char) {
        self.emit(kind, idx, idx + c.len_utf8(), c.to_string());
        self.bump();
    }

    /// Scan an escape sequence starting at the backslash.
    ///
    /// Grammar: `\` [digits `,`] (`u` hex4 | `U` hex8 | char). The token
    /// value is the raw source after the backslash; quantity parsing and hex
    /// validation are the parser's business.
    fn scan_escape(&mut self, esc_start: usize) {
        let line = self.line;
        let line_start = self.line_start;
        self.bump(); // backslash

        let Some(first) = self.peek() else {
            self.report(ErrorKind::IncompleteEscape, esc_start, 1);
            self.abort();
            return;
        };
        if first.is_whitespace() {
            self.report(ErrorKind::EscapedWhitespace, self.pos, first.len_utf8());
            self.bump();
            return;
        }

        if first.is_ascii_digit() {
            while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                self.bump();
            }
            // A quantifier needs at least a comma and one payload character.
            if !self.has_chars(2) {
                self.report(ErrorKind::IncompleteEscape, esc_start, self.src.len() - esc_start);
                self.abort();
                return;
            }
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(other) => {
                    self.report(ErrorKind::MissingQuantityComma, self.pos, other.len_utf8());
                    self.bump();
                    return;
                }
                None => unreachable!("guarded by has_chars"),
            }
        }

        let Some(payload) = self.peek() else {
            self.report(ErrorKind::IncompleteEscape, esc_start, self.src.len() - esc_start);
            self.abort();
            return;
        };
        if payload.is_whitespace() {
            self.report(ErrorKind::EscapedWhitespace, self.pos, payload.len_utf8());
            self.bump();
            return;
        }

        match payload {
            'u' => self.scan_code_point(
                esc_start,
                line,
                line_start,
                4,
                TokenKind::EscapeSequenceUnicode,
            ),
            'U' => self.scan_code_point(
                esc_start,
                line,
                line_start,
                8,
                TokenKind::EscapeSequenceSurrogatePair,
            ),
            _ => {
                self.bump();
                let value = self.src[esc_start + 1..self.pos].to_string();
                self.emit_at(
                    TokenKind::EscapeSequenceChar,
                    line,
                    line_start,
                    esc_start,
                    self.pos,
                    value,
                );
            }
        }
    }

    /// Consume `u`/`U` plus its fixed-width code point digits.
    fn scan_code_point(
        &mut self,
        esc_start: usize,
        line: usize,
        line_start: usize,
        width: usize,
        kind: TokenKind,
    ) {
        self.bump(); // marker
        if !self.has_chars(width) {
            self.report(ErrorKind::IncompleteEscape, esc_start, self.src.len() - esc_start);
            self.abort();
            return;
        }
        for _ in 0..width {
            self.bump();
        }
        let value = self.src[esc_start + 1..self.pos].to_string();
        self.emit_at(kind, line, line_start, esc_start, self.pos, value);
    }

    /// Scan a `"`-delimited verbatim string into the text buffer.
    ///
    /// `""` inside the string is an escaped quote. The content joins pending
    /// text rather than becoming its own token; an unterminated string
    /// contributes nothing.
    fn scan_verbatim(&mut self, quote_start: usize) {
        let line = self.line;
        let line_start = self.line_start;
        if !self.has_chars(3) {
            self.report(ErrorKind::IncompleteVerbatim, quote_start, 1);
            self.abort();
            return;
        }
        self.bump(); // opening quote
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    self.report_on_line(
                        ErrorKind::IncompleteVerbatim,
                        line,
                        line_start,
                        quote_start,
                        self.pos - quote_start,
                    );
                    self.abort();
                    return;
                }
                Some('"') => {
                    if self.peek_second() == Some('"') {
                        buf.push('"');
                        self.bump();
                        self.bump();
                    } else {
                        self.bump(); // closing quote
                        if !buf.is_empty() {
                            if self.text.is_empty() {
                                self.text_start = quote_start;
                                self.text_line = line;
                                self.text_line_start = line_start;
                            }
                            self.text.push_str(&buf);
                        }
                        self.text_end = self.pos;
                        return;
                    }
                }
                Some(ch) => {
                    buf.push(ch);
                    self.bump();
                }
            }
        }
    }

    /// Scan a `` ` ``-delimited regex literal plus any trailing flag letters.
    ///
    /// `` \` `` keeps a literal backtick in the body; all other escapes pass
    /// through for the regex engine to interpret. The body may be empty, but
    /// at least three characters must remain at the opening backtick.
    fn scan_regex(&mut self, tick_start: usize) {
        let line = self.line;
        let line_start = self.line_start;
        if !self.has_chars(3) {
            self.report(
                ErrorKind::IncompleteRegex,
                tick_start,
                self.src.len() - tick_start,
            );
            self.abort();
            return;
        }
        self.bump(); // opening backtick
        let mut buf = String::new();
        loop {
            match self.peek() {
                None => {
                    self.report_on_line(
                        ErrorKind::IncompleteRegex,
                        line,
                        line_start,
                        tick_start,
                        self.pos - tick_start,
                    );
                    self.abort();
                    return;
                }
                Some('\\') => {
                    // Room for the escaped character and a closing backtick.
                    if !self.has_chars(3) {
                        self.report_on_line(
                            ErrorKind::IncompleteRegex,
                            line,
                            line_start,
                            tick_start,
                            self.src.len() - tick_start,
                        );
                        self.abort();
                        return;
                    }
                    buf.push('\\');
                    if self.peek_second() == Some('`') {
                        buf.push('`');
                        self.bump();
                        self.bump();
                    } else {
                        self.bump();
                    }
                }
                Some('`') => {
                    self.bump(); // closing backtick
                    self.emit_at(TokenKind::Regex, line, line_start, tick_start, self.pos, buf);
                    let flags_start = self.pos;
                    let mut flags = String::new();
                    while let Some(l) = self.peek() {
                        if !l.is_alphabetic() {
                            break;
                        }
                        flags.push(l);
                        self.bump();
                    }
                    if !flags.is_empty() {
                        self.emit(TokenKind::RegexFlags, flags_start, self.pos, flags);
                    }
                    return;
                }
                Some(ch) => {
                    buf.push(ch);
                    self.bump();
                }
            }
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.ready.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }
            self.scan_cycle();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn text_flushes_before_the_token_that_forced_it() {
        let (tokens, diags) = tokenize("ab c");
        assert!(diags.is_empty());
        let got: Vec<(TokenKind, &str, usize)> = tokens
            .iter()
            .map(|t| (t.kind, t.value.as_str(), t.index))
            .collect();
        assert_eq!(
            got,
            vec![
                (TokenKind::Text, "ab", 0),
                (TokenKind::Whitespace, " ", 2),
                (TokenKind::Text, "c", 3),
            ]
        );
    }

    #[test]
    fn whitespace_at_line_start_is_suppressed() {
        let (tokens, _) = tokenize("  a\n  b");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Text]
        );
        assert_eq!(tokens[0].value, "a\nb");
    }

    #[test]
    fn comments_produce_nothing_and_do_not_split_text() {
        let (tokens, diags) = tokenize("a# hidden\nb");
        assert!(diags.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "a\nb");
    }

    #[test]
    fn line_bookkeeping_survives_multiline_literals() {
        let (tokens, diags) = tokenize("\"x\ny\"[z]");
        assert!(diags.is_empty());
        let bracket = tokens
            .iter()
            .find(|t| t.kind == TokenKind::LeftSquare)
            .unwrap();
        assert_eq!(bracket.line, 2);
        assert_eq!(bracket.column(), 2);
    }

    #[test]
    fn double_colon_and_negated_match_are_single_tokens() {
        assert_eq!(
            kinds("::?!?"),
            vec![TokenKind::DoubleColon, TokenKind::Without, TokenKind::Question]
        );
    }

    #[test]
    fn truncated_escape_stops_the_scanner() {
        let (tokens, diags) = tokenize("abc\\");
        // Buffered text is discarded along with the broken construct.
        assert!(tokens.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind.code_suffix(), "incomplete_escape");
    }

    #[test]
    fn escape_value_carries_quantifier_and_payload() {
        let (tokens, diags) = tokenize("\\16,x");
        assert!(diags.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EscapeSequenceChar);
        assert_eq!(tokens[0].index, 0);
        assert_eq!(tokens[0].value, "16,x");
    }
}
