//! The Patter command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::{fs, path::Path, path::PathBuf, process};

use clap::{Parser, Subcommand};
use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{
    compile,
    diagnostics::CompileError,
    lexer,
    registry::standard_registry,
    syntax::FunctionSignature,
    Compilation,
};

// ============================================================================
// CLI ARGUMENTS - Command-line argument definitions
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "patter",
    version,
    about = "A compiler front end for the Patter procedural text-generation language."
)]
pub struct PatterArgs {
    #[command(subcommand)]
    pub command: ArgsCommand,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Compile a pattern file and report every diagnostic found.
    Compile {
        /// The path to the pattern file to compile.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the token stream for a pattern file as JSON.
    Tokens {
        /// The path to the pattern file to tokenize.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Show the syntax tree for a compiled pattern.
    Tree {
        /// The path to the pattern file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// List all built-in functions with their accepted argument counts.
    Functions,
}

// ============================================================================
// MAIN ENTRY POINT - Direct compiler calls
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = PatterArgs::parse();

    match args.command {
        ArgsCommand::Compile { file } => {
            let source = read_file_or_exit(&file);
            match compile(&source_name(&file), &source) {
                Ok(compilation) => print_summary(&compilation),
                Err(error) => {
                    print_error(error);
                    process::exit(1);
                }
            }
        }

        ArgsCommand::Tokens { file } => {
            let source = read_file_or_exit(&file);
            print_tokens(&source_name(&file), &source);
        }

        ArgsCommand::Tree { file } => {
            let source = read_file_or_exit(&file);
            match compile(&source_name(&file), &source) {
                Ok(compilation) => println!("{}", compilation.root.pretty()),
                Err(error) => {
                    print_error(error);
                    process::exit(1);
                }
            }
        }

        ArgsCommand::Functions => {
            print_functions();
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS - Common patterns extracted
// ============================================================================

fn read_file_or_exit(path: &PathBuf) -> String {
    fs::read_to_string(path).unwrap_or_else(|error| {
        eprintln!("Error reading {}: {}", path.display(), error);
        process::exit(1);
    })
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// OUTPUT FUNCTIONS - Simple, direct output
// ============================================================================

fn print_error(error: CompileError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}

fn print_summary(compilation: &Compilation) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    println!("Compiled successfully");
    let _ = stdout.reset();

    if let Some(module) = &compilation.module {
        println!("Module functions:");
        for name in module.names() {
            println!("  {}", name);
        }
    }

    for warning in &compilation.warnings {
        let report = Report::new(warning.clone());
        eprintln!("{report:?}");
    }
}

fn print_tokens(name: &str, source: &str) {
    let (tokens, diagnostics) = lexer::tokenize(source);
    match serde_json::to_string_pretty(&tokens) {
        Ok(json) => println!("{}", json),
        Err(error) => {
            eprintln!("Error serializing tokens: {}", error);
            process::exit(1);
        }
    }
    if !diagnostics.is_empty() {
        print_error(CompileError::new(name, source, diagnostics));
        process::exit(1);
    }
}

fn print_functions() {
    let registry = standard_registry();
    if registry.is_empty() {
        println!("  No functions registered.");
        return;
    }

    for name in registry.list() {
        let Some(signature) = registry.signature(&name) else {
            continue;
        };
        if signature.name != name {
            println!("  {} (alias of {})", name, signature.name);
        } else {
            println!("  {} [{} args]", name, describe_arity(signature));
        }
    }
}

fn describe_arity(signature: &FunctionSignature) -> String {
    match signature.max_args {
        Some(max) if max == signature.min_args => max.to_string(),
        Some(max) => format!("{}-{}", signature.min_args, max),
        None => format!("{}+", signature.min_args),
    }
}
