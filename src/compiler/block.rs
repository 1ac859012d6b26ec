//! Block parsing: `{a|b|c}` branching constructs.
//!
//! A block is a list of element sequences separated by `|`. The runtime
//! picks one element per visit, so even an empty block (`{}`) carries one
//! empty element rather than none.

use crate::compiler::{sequence, CompileContext, Compiler};
use crate::lexer::Token;
use crate::syntax::{slice_span, Rst, Span};

/// Parse one block. `left_curly` is the already-consumed `{`.
pub fn parse_block(compiler: &mut Compiler, left_curly: &Token, output: &mut Vec<Rst>) {
    let depth = compiler.depth();
    compiler.push_context(CompileContext::BlockEnd);
    compiler.push_context(CompileContext::BlockSequence);

    let mut elements = Vec::new();
    loop {
        if compiler.next_context() != CompileContext::BlockSequence {
            break;
        }
        if compiler.at_end() {
            compiler.report_unexpected_end(CompileContext::BlockSequence);
            break;
        }
        let start = compiler.peek_span().unwrap_or_default();
        let mut actions = Vec::new();
        sequence::parse_sequence(compiler, &mut actions);
        let span = slice_span(&actions).unwrap_or_else(|| Span::new(start.start, start.start));
        elements.push(Rst::Sequence {
            children: actions,
            span,
        });
    }
    compiler.unwind_to(depth);

    let end = compiler.prev_span().map_or(left_curly.end, |s| s.end);
    output.push(Rst::Block {
        elements,
        span: Span::new(left_curly.index, end),
    });
}
