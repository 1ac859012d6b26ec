//! # Patter
//!
//! Compiler front end for the Patter procedural text-generation language:
//! a hand-rolled lexer and a context-driven recursive parser producing a
//! runtime syntax tree (RST) plus an optional module function table.
//!
//! ```
//! let compilation = patter::compile("hello.patter", "Hello, {world|there}!").unwrap();
//! assert!(compilation.module.is_none());
//! ```

pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod lexer;
pub mod module;
pub mod registry;
pub mod syntax;

pub use crate::compiler::{compile, compile_with, compile_with_sink, Compilation, CompileContext};
pub use crate::diagnostics::{CompileError, Diagnostic, DiagnosticSink, Diagnostics, ErrorKind};
pub use crate::lexer::{tokenize, Token, TokenKind};
pub use crate::module::Module;
pub use crate::registry::{standard_registry, FunctionRegistry, StandardRegistry};
pub use crate::syntax::{FunctionSignature, ParamMode, Rst, Span};
