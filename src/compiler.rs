//! Compilation driver and context machinery.
//!
//! Parsing is organized as a set of cooperating parser units (sequence, tag,
//! block) that call one another synchronously and pass results through
//! caller-owned accumulators. What a unit may consume is governed by a stack
//! of [`CompileContext`] values owned by the [`Compiler`] driver: a unit
//! pushes the context that should govern its delegate before handing over,
//! and restores the stack to its saved depth when the delegate returns, no
//! matter how the delegate exited.
//!
//! The driver also owns the expectation layer over the token reader: strict
//! and loose reads that report an "unexpected token" diagnostic on mismatch
//! without consuming the offending token, keeping recovery local to the unit
//! that noticed the problem.

use crate::diagnostics::{
    CompileError, Diagnostic, DiagnosticSink, Diagnostics, ErrorKind, SourcePosition,
};
use crate::lexer::{Token, TokenKind};
use crate::module::Module;
use crate::registry::{standard_registry, FunctionRegistry};
use crate::syntax::{Rst, Span};

use self::reader::TokenReader;

// ============================================================================
// CONTEXTS
// ============================================================================

/// Parse states governing which tokens end the current parser unit.
///
/// A context is pushed immediately before the unit that needs it starts
/// consuming tokens and popped exactly once when that unit (or an error path)
/// finishes, so stack depth always equals the nesting depth of open grammar
/// constructs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompileContext {
    /// Top-level program content; ends only at end of input.
    DefaultSequence,
    /// One element of a block; `|` ends the element, `}` ends the block.
    BlockSequence,
    /// Between the last block element and the block's close.
    BlockEnd,
    /// One argument of a tag; `;` ends the argument, `]` ends the list.
    ArgumentSequence,
    /// Between the last argument and the tag's close.
    FunctionEnd,
    /// A subroutine definition body; ends at `]`.
    SubroutineBody,
}

impl CompileContext {
    /// What the sequence parser accepts in this context; used in diagnostics.
    pub fn expected_description(&self) -> &'static str {
        match self {
            CompileContext::DefaultSequence => "text or a tag",
            CompileContext::BlockSequence => "a block element, '|', or closing brace '}'",
            CompileContext::BlockEnd => "closing brace '}'",
            CompileContext::ArgumentSequence => "an argument, ';', or closing bracket ']'",
            CompileContext::FunctionEnd => "closing bracket ']'",
            CompileContext::SubroutineBody => "body content or closing bracket ']'",
        }
    }
}

// ============================================================================
// COMPILER DRIVER
// ============================================================================

/// A successfully compiled source unit.
#[derive(Debug, Clone)]
pub struct Compilation {
    /// Root sequence covering the whole source.
    pub root: Rst,
    /// Module function table, present when the source defined any
    /// module-exported subroutine.
    pub module: Option<Module>,
    /// Non-fatal diagnostics collected during the compile.
    pub warnings: Vec<Diagnostic>,
}

/// Drives one compilation: owns the reader, the context stack, the module
/// table, and the sink every diagnostic is delivered to.
pub struct Compiler<'a> {
    reader: TokenReader<'a>,
    sink: &'a mut dyn DiagnosticSink,
    registry: &'a dyn FunctionRegistry,
    contexts: Vec<CompileContext>,
    module: Module,
    has_module: bool,
    eof_reported: bool,
    source_len: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(
        source: &'a str,
        registry: &'a dyn FunctionRegistry,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            reader: TokenReader::new(source),
            sink,
            registry,
            contexts: Vec::new(),
            module: Module::new(),
            has_module: false,
            eof_reported: false,
            source_len: source.len(),
        }
    }

    /// Parse the whole source into a root sequence, reporting diagnostics to
    /// the sink as they are discovered.
    pub fn run(mut self) -> (Rst, Option<Module>) {
        let mut children = Vec::new();
        sequence::parse_sequence(&mut self, &mut children);
        self.flush_lexer_diagnostics();
        let root = Rst::Sequence {
            children,
            span: Span::new(0, self.source_len),
        };
        let module = if self.has_module {
            Some(self.module)
        } else {
            None
        };
        (root, module)
    }

    // ==== CONTEXT STACK ====

    pub(crate) fn push_context(&mut self, context: CompileContext) {
        self.contexts.push(context);
    }

    pub(crate) fn pop_context(&mut self) -> Option<CompileContext> {
        self.contexts.pop()
    }

    /// The context governing the next parser unit (top of stack).
    pub(crate) fn next_context(&self) -> CompileContext {
        self.contexts
            .last()
            .copied()
            .unwrap_or(CompileContext::DefaultSequence)
    }

    pub(crate) fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// Truncate the stack back to `depth`. Every delegating unit calls this
    /// on exit, so error paths cannot leave stale contexts behind.
    pub(crate) fn unwind_to(&mut self, depth: usize) {
        self.contexts.truncate(depth);
    }

    // ==== MODULE ====

    pub(crate) fn set_has_module(&mut self) {
        self.has_module = true;
    }

    pub(crate) fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub(crate) fn registry(&self) -> &'a dyn FunctionRegistry {
        self.registry
    }

    // ==== DIAGNOSTICS ====

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    pub(crate) fn error(&mut self, kind: ErrorKind, position: SourcePosition) {
        self.report(Diagnostic::error(kind, position));
    }

    pub(crate) fn error_at(&mut self, kind: ErrorKind, token: &Token) {
        self.error(kind, token.position());
    }

    /// Report input ending inside an open construct. Only the discovering
    /// unit reports; enclosing units unwind silently.
    pub(crate) fn report_unexpected_end(&mut self, context: CompileContext) {
        if self.eof_reported || context == CompileContext::DefaultSequence {
            return;
        }
        self.eof_reported = true;
        let position = self.reader.end_position();
        self.error(
            ErrorKind::UnexpectedEndOfInput {
                expected: context.expected_description().into(),
            },
            position,
        );
    }

    fn report_end_of_input(&mut self, expected: &str) {
        if self.eof_reported {
            return;
        }
        self.eof_reported = true;
        let position = self.reader.end_position();
        self.error(
            ErrorKind::UnexpectedEndOfInput {
                expected: expected.into(),
            },
            position,
        );
    }

    fn flush_lexer_diagnostics(&mut self) {
        for diagnostic in self.reader.take_lexer_diagnostics() {
            self.report(diagnostic);
        }
    }

    // ==== TOKEN ACCESS ====

    /// Next token, with any pending lexical diagnostics forwarded first.
    pub(crate) fn next_token(&mut self) -> Option<Token> {
        let token = self.reader.next();
        self.flush_lexer_diagnostics();
        token
    }

    pub(crate) fn peek_kind(&mut self) -> Option<TokenKind> {
        let kind = self.reader.peek_kind();
        self.flush_lexer_diagnostics();
        kind
    }

    pub(crate) fn peek_span(&mut self) -> Option<Span> {
        let span = self.reader.peek().map(Token::span);
        self.flush_lexer_diagnostics();
        span
    }

    pub(crate) fn at_end(&mut self) -> bool {
        let end = self.reader.at_end();
        self.flush_lexer_diagnostics();
        end
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Option<Span> {
        self.reader.prev_token().map(Token::span)
    }

    /// Consume the next token if it has `kind`; no diagnostic on mismatch.
    pub(crate) fn take(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.reader.take(kind);
        self.flush_lexer_diagnostics();
        token
    }

    /// Strict read: consume a `kind` token, or report an unexpected-token
    /// error (leaving the offender unconsumed) and return `None`.
    pub(crate) fn read(&mut self, kind: TokenKind, expected: &str) -> Option<Token> {
        let peeked = self.reader.peek().map(|t| (t.kind, t.position()));
        self.flush_lexer_diagnostics();
        match peeked {
            Some((found, _)) if found == kind => self.reader.next(),
            Some((found, position)) => {
                self.error(
                    ErrorKind::UnexpectedToken {
                        expected: expected.into(),
                        found: found.describe().into(),
                    },
                    position,
                );
                None
            }
            None => {
                self.report_end_of_input(expected);
                None
            }
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.reader.peek_kind() == Some(TokenKind::Whitespace) {
            self.reader.next();
        }
        self.flush_lexer_diagnostics();
    }

    /// Strict read past any insignificant whitespace.
    pub(crate) fn read_loose(&mut self, kind: TokenKind, expected: &str) -> Option<Token> {
        self.skip_whitespace();
        self.read(kind, expected)
    }

    /// Consume a `kind` token past any whitespace; reports whether one was
    /// there, never erroring.
    pub(crate) fn take_loose(&mut self, kind: TokenKind) -> bool {
        self.skip_whitespace();
        self.take(kind).is_some()
    }

    pub(crate) fn peek_loose_kind(&mut self) -> Option<TokenKind> {
        self.skip_whitespace();
        self.peek_kind()
    }

    pub(crate) fn next_loose_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        self.next_token()
    }
}

// ============================================================================
// PARSER UNITS
// ============================================================================

pub mod block;
pub mod reader;
pub mod sequence;
pub mod tag;

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Compile `source` against the standard function registry.
///
/// `name` identifies the source in rendered diagnostics (a file name, or
/// something like `<repl>`).
pub fn compile(name: &str, source: &str) -> Result<Compilation, CompileError> {
    compile_with(name, source, standard_registry())
}

/// Compile `source` against a caller-provided function registry.
pub fn compile_with(
    name: &str,
    source: &str,
    registry: &dyn FunctionRegistry,
) -> Result<Compilation, CompileError> {
    let mut diagnostics = Diagnostics::new();
    let (root, module) = Compiler::new(source, registry, &mut diagnostics).run();
    diagnostics.sort_by_position();
    if diagnostics.has_errors() {
        Err(CompileError::new(name, source, diagnostics.into_vec()))
    } else {
        let mut warnings = diagnostics.into_vec();
        crate::diagnostics::attach_source(name, source, &mut warnings);
        Ok(Compilation {
            root,
            module,
            warnings,
        })
    }
}

/// Compile with diagnostics streamed to `sink` as they are found, instead of
/// collected. Returns the tree and module unconditionally; judging success
/// is the caller's business.
pub fn compile_with_sink(
    source: &str,
    registry: &dyn FunctionRegistry,
    sink: &mut dyn DiagnosticSink,
) -> (Rst, Option<Module>) {
    Compiler::new(source, registry, sink).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_compiles_to_an_empty_root() {
        let compilation = compile("empty.patter", "").unwrap();
        match compilation.root {
            Rst::Sequence { ref children, span } => {
                assert!(children.is_empty());
                assert_eq!(span, Span::new(0, 0));
            }
            ref other => panic!("unexpected root: {}", other.pretty()),
        }
        assert!(compilation.module.is_none());
    }

    #[test]
    fn unwind_restores_saved_depth() {
        let mut diagnostics = Diagnostics::new();
        let mut compiler = Compiler::new("", standard_registry(), &mut diagnostics);
        let depth = compiler.depth();
        compiler.push_context(CompileContext::FunctionEnd);
        compiler.push_context(CompileContext::ArgumentSequence);
        compiler.unwind_to(depth);
        assert_eq!(compiler.depth(), 0);
        assert_eq!(compiler.next_context(), CompileContext::DefaultSequence);
    }
}
