//! The sequence parser: the workhorse unit every other unit delegates to.
//!
//! Consumes tokens until a terminator appropriate to the context captured at
//! entry, appending finished nodes to the caller's accumulator. Structural
//! tokens with no role in the current context are reported and skipped;
//! non-structural punctuation falls through to literal text.

use crate::compiler::{block, tag, CompileContext, Compiler};
use crate::diagnostics::ErrorKind;
use crate::lexer::{Token, TokenKind};
use crate::syntax::Rst;

/// Parse one sequence under the context at the top of the stack, appending
/// nodes to `output`.
///
/// Returns when a terminator for that context is consumed or input ends. The
/// terminator's stack effect happens here: closers (`]`, `}`) pop the context
/// they terminate, separators (`|`, `;`) end the sequence without popping so
/// the delegating unit can start the next element or argument.
pub fn parse_sequence(compiler: &mut Compiler, output: &mut Vec<Rst>) {
    let context = compiler.next_context();
    loop {
        let Some(token) = compiler.next_token() else {
            compiler.report_unexpected_end(context);
            return;
        };
        match token.kind {
            TokenKind::Text | TokenKind::Whitespace => push_text(output, &token),
            TokenKind::EscapeSequenceChar
            | TokenKind::EscapeSequenceUnicode
            | TokenKind::EscapeSequenceSurrogatePair => {
                if let Some(node) = decode_escape(compiler, &token) {
                    output.push(node);
                }
            }
            TokenKind::LeftSquare => tag::parse_tag(compiler, &token, output),
            TokenKind::LeftCurly => block::parse_block(compiler, &token, output),
            TokenKind::RightSquare => match context {
                CompileContext::ArgumentSequence | CompileContext::SubroutineBody => {
                    compiler.pop_context();
                    return;
                }
                _ => stray(compiler, context, &token),
            },
            TokenKind::RightCurly => match context {
                CompileContext::BlockSequence => {
                    compiler.pop_context();
                    return;
                }
                _ => stray(compiler, context, &token),
            },
            TokenKind::Pipe => match context {
                // Ends this element; the block parser starts the next one.
                CompileContext::BlockSequence => return,
                _ => stray(compiler, context, &token),
            },
            TokenKind::Semicolon => match context {
                // Ends this argument; the argument reader starts the next.
                CompileContext::ArgumentSequence => return,
                _ => push_text(output, &token),
            },
            TokenKind::Regex | TokenKind::RegexFlags => stray(compiler, context, &token),
            // Remaining punctuation has no structural role in a sequence.
            _ => push_text(output, &token),
        }
    }
}

fn push_text(output: &mut Vec<Rst>, token: &Token) {
    output.push(Rst::Text {
        text: token.value.clone(),
        span: token.span(),
    });
}

fn stray(compiler: &mut Compiler, context: CompileContext, token: &Token) {
    compiler.error_at(
        ErrorKind::UnexpectedToken {
            expected: context.expected_description().into(),
            found: token.kind.describe().into(),
        },
        token,
    );
}

/// Decode an escape token into an `Escape` node.
///
/// Token values look like `x`, `u2665`, `U0001F49C`, or `12,x`: optional
/// quantity digits and comma, then the payload. Hex payloads are validated
/// here rather than in the lexer; quantities beyond `usize` clamp to
/// `usize::MAX`.
fn decode_escape(compiler: &mut Compiler, token: &Token) -> Option<Rst> {
    let value = token.value.as_str();
    let digits_len = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (count, payload) = if digits_len > 0 && value[digits_len..].starts_with(',') {
        (
            // A count too large for usize saturates instead of failing.
            value[..digits_len].parse::<usize>().unwrap_or(usize::MAX),
            &value[digits_len + 1..],
        )
    } else {
        (1, value)
    };
    let character = match token.kind {
        TokenKind::EscapeSequenceChar => payload.chars().next()?,
        _ => {
            // Skip the u/U marker. The digits are checked by hand because
            // the integer parser tolerates a leading sign.
            let hex = &payload[1..];
            let code_point = if hex.chars().all(|c| c.is_ascii_hexdigit()) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else {
                None
            };
            match code_point {
                Some(c) => c,
                None => {
                    compiler.error_at(
                        ErrorKind::InvalidCodePoint {
                            digits: hex.to_string(),
                        },
                        token,
                    );
                    return None;
                }
            }
        }
    };
    Some(Rst::Escape {
        character,
        count,
        span: token.span(),
    })
}
