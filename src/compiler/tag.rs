//! Tag parsing: function calls, subroutine definitions and calls, replacers.
//!
//! Entered by the sequence parser immediately after `[`. Dispatch is on the
//! first token inside the tag: a regex literal opens a replacer, `$` opens
//! subroutine syntax, anything else is a function call.
//!
//! Function names resolve against the registry at compile time; subroutine
//! calls resolve at run time and get no registry check. Registry checks run
//! after the argument list has been consumed, so a bad name still leaves the
//! reader positioned past the whole tag.

use regex::RegexBuilder;

use crate::compiler::{sequence, CompileContext, Compiler};
use crate::diagnostics::{ErrorKind, SourcePosition};
use crate::lexer::{Token, TokenKind};
use crate::syntax::{slice_span, ParamMode, Rst, Span};

/// Parse one tag. `left_square` is the already-consumed `[`.
pub fn parse_tag(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    match compiler.peek_kind() {
        Some(TokenKind::Regex) => parse_replacer(compiler, left_square, output),
        Some(TokenKind::Dollar) => {
            compiler.next_token();
            parse_subroutine(compiler, left_square, output);
        }
        _ => parse_function(compiler, left_square, output),
    }
}

// ==== FUNCTIONS ====

fn parse_function(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    let name = compiler.read(TokenKind::Text, "function name");

    let mut arguments = Vec::new();
    if compiler.peek_kind() == Some(TokenKind::Colon) {
        compiler.next_token();
        read_arguments(compiler, &mut arguments);
    } else {
        compiler.read(TokenKind::RightSquare, "closing bracket ']'");
    }

    // Resolution happens after the arguments so a bad name does not derail
    // the reader mid-tag.
    let Some(name) = name else { return };
    if !compiler.registry().function_exists(&name.value) {
        compiler.error_at(
            ErrorKind::NonexistentFunction {
                name: name.value.clone(),
            },
            &name,
        );
        return;
    }
    let signature = match compiler.registry().get_function(&name.value, arguments.len()) {
        Some(signature) => signature.clone(),
        None => {
            compiler.error_at(
                ErrorKind::NonexistentOverload {
                    name: name.value.clone(),
                    arg_count: arguments.len(),
                },
                &name,
            );
            return;
        }
    };

    let span = left_square
        .span()
        .merge(compiler.prev_span().unwrap_or_else(|| name.span()));
    output.push(Rst::Function {
        name: name.value.clone(),
        signature,
        args: arguments,
        span,
    });
}

// ==== REPLACERS ====

fn parse_replacer(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    let Some(regex_token) = compiler.read(TokenKind::Regex, "replacer pattern") else {
        return;
    };
    let flags = compiler.take(TokenKind::RegexFlags);
    let pattern = compile_pattern(compiler, &regex_token, flags.as_ref());

    if compiler
        .read(TokenKind::Colon, "':' before replacer arguments")
        .is_none()
    {
        return;
    }

    let mut arguments = Vec::new();
    read_arguments(compiler, &mut arguments);

    if arguments.len() != 2 {
        let position = tag_range(compiler, left_square);
        compiler.error(
            ErrorKind::ReplacerArgumentCount {
                count: arguments.len(),
            },
            position,
        );
        return;
    }
    // Pattern failures were already reported; the arguments still had to be
    // consumed to keep the reader in sync.
    let Some(pattern) = pattern else { return };

    let span = left_square
        .span()
        .merge(compiler.prev_span().unwrap_or_else(|| regex_token.span()));
    let mut args = arguments.into_iter();
    let (Some(subject), Some(replacement)) = (args.next(), args.next()) else {
        return;
    };
    output.push(Rst::Replacer {
        regex_source: regex_token.value.clone(),
        pattern,
        subject: Box::new(subject),
        replacement: Box::new(replacement),
        span,
    });
}

/// Compile a regex literal, applying any flags token (`i m s x`).
fn compile_pattern(
    compiler: &mut Compiler,
    regex_token: &Token,
    flags: Option<&Token>,
) -> Option<regex::Regex> {
    let mut builder = RegexBuilder::new(&regex_token.value);
    if let Some(flags) = flags {
        for flag in flags.value.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                other => compiler.error_at(ErrorKind::UnknownRegexFlag { flag: other }, flags),
            }
        }
    }
    match builder.build() {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            compiler.error_at(
                ErrorKind::InvalidRegex {
                    reason: error.to_string(),
                },
                regex_token,
            );
            None
        }
    }
}

// ==== SUBROUTINES ====

fn parse_subroutine(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    if compiler.take_loose(TokenKind::LeftSquare) {
        parse_subroutine_definition(compiler, left_square, output);
    } else {
        parse_subroutine_call(compiler, left_square, output);
    }
}

/// `$[.name:params]: body ]` or `$[.name:params: body ]`.
///
/// The `.` before the name exports the finished definition into the unit's
/// module table; it flags the compile as module-bearing the moment it is
/// seen. The `]` closing the parameter group is accepted but not required;
/// the `:` before the body is.
fn parse_subroutine_definition(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    let in_module = compiler.take_loose(TokenKind::Period);
    if in_module {
        compiler.set_has_module();
    }
    let name = compiler.read_loose(TokenKind::Text, "subroutine name");

    let mut parameters: Vec<(String, ParamMode)> = Vec::new();
    if compiler.peek_loose_kind() == Some(TokenKind::Colon) {
        compiler.next_loose_token();
        loop {
            let mode = if compiler.take_loose(TokenKind::At) {
                ParamMode::Loose
            } else {
                ParamMode::Greedy
            };
            if let Some(param) = compiler.read_loose(TokenKind::Text, "parameter name") {
                match parameters.iter_mut().find(|(n, _)| *n == param.value) {
                    Some(entry) => entry.1 = mode,
                    None => parameters.push((param.value.clone(), mode)),
                }
            }
            if !compiler.take_loose(TokenKind::Semicolon) {
                break;
            }
        }
    }

    compiler.take_loose(TokenKind::RightSquare);
    let Some(body_start) = compiler.read_loose(TokenKind::Colon, "':' before subroutine body")
    else {
        return;
    };

    let depth = compiler.depth();
    compiler.push_context(CompileContext::SubroutineBody);
    let mut actions = Vec::new();
    sequence::parse_sequence(compiler, &mut actions);
    compiler.unwind_to(depth);

    let body_span =
        slice_span(&actions).unwrap_or_else(|| Span::new(body_start.end, body_start.end));
    let body = Rst::Sequence {
        children: actions,
        span: body_span,
    };

    let Some(name) = name else { return };
    let span = left_square
        .span()
        .merge(compiler.prev_span().unwrap_or(body_span));
    let node = Rst::DefineSubroutine {
        name: name.value.clone(),
        parameters,
        body: Box::new(body),
        span,
    };
    if in_module {
        compiler.module_mut().add_action_function(&name.value, node.clone());
    }
    output.push(node);
}

/// `$name`, `$name.member`, with the same argument convention as functions.
fn parse_subroutine_call(compiler: &mut Compiler, left_square: &Token, output: &mut Vec<Rst>) {
    let name = compiler.read(TokenKind::Text, "subroutine name");

    let mut module_function = None;
    if compiler.take_loose(TokenKind::Period) {
        module_function = compiler
            .read(TokenKind::Text, "module function name")
            .map(|t| t.value);
    }

    let mut arguments = Vec::new();
    if compiler.peek_kind() == Some(TokenKind::Colon) {
        compiler.next_token();
        read_arguments(compiler, &mut arguments);
    } else {
        compiler.read(TokenKind::RightSquare, "closing bracket ']'");
    }

    let Some(name) = name else { return };
    let span = left_square
        .span()
        .merge(compiler.prev_span().unwrap_or_else(|| name.span()));
    output.push(Rst::CallSubroutine {
        name: name.value.clone(),
        module_function,
        args: arguments,
        span,
    });
}

// ==== ARGUMENT LISTS ====

/// Read `;`-separated argument sequences until the list's `]` pops the
/// argument context. Every pass appends one argument, even an empty one, so
/// `[f:]` carries exactly one empty argument.
fn read_arguments(compiler: &mut Compiler, arguments: &mut Vec<Rst>) {
    let depth = compiler.depth();
    compiler.push_context(CompileContext::FunctionEnd);
    compiler.push_context(CompileContext::ArgumentSequence);
    loop {
        if compiler.next_context() != CompileContext::ArgumentSequence {
            break;
        }
        if compiler.at_end() {
            compiler.report_unexpected_end(CompileContext::ArgumentSequence);
            break;
        }
        let start = compiler.peek_span().unwrap_or_default();
        let mut actions = Vec::new();
        sequence::parse_sequence(compiler, &mut actions);
        let span = slice_span(&actions).unwrap_or_else(|| Span::new(start.start, start.start));
        arguments.push(Rst::Sequence {
            children: actions,
            span,
        });
    }
    compiler.unwind_to(depth);
}

/// Error range spanning the whole tag, from `[` to the last consumed token.
fn tag_range(compiler: &Compiler, left_square: &Token) -> SourcePosition {
    let end = compiler.prev_span().map_or(left_square.end, |s| s.end);
    SourcePosition::new(
        left_square.line,
        left_square.line_start_offset,
        left_square.index,
        end.saturating_sub(left_square.index),
    )
}
