//! Syntax tree types for the Patter language.
//!
//! The compiler front end produces an RST (runtime syntax tree): a tree of
//! typed nodes that a downstream interpreter walks to generate output. Every
//! node carries a source span for error reporting and tooling.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Represents a span in the source code, in byte offsets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Passing convention for a subroutine parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamMode {
    /// Evaluated eagerly at the call site (the default).
    Greedy,
    /// Deferred; marked with a leading `@` in the definition.
    Loose,
}

/// A resolved function signature: the name and the argument counts it accepts.
///
/// Signatures are owned by the registry and cloned into `Rst::Function` nodes
/// at resolution time, so the tree stays self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub min_args: usize,
    /// `None` means variadic beyond `min_args`.
    pub max_args: Option<usize>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, min_args: usize, max_args: Option<usize>) -> Self {
        Self {
            name: name.into(),
            min_args,
            max_args,
        }
    }

    pub fn accepts(&self, arg_count: usize) -> bool {
        arg_count >= self.min_args && self.max_args.map_or(true, |max| arg_count <= max)
    }
}

/// A node of the runtime syntax tree.
///
/// Nodes own their children outright; there is no sharing and no cycles. A
/// node is fully populated when constructed and never mutated afterward.
#[derive(Debug, Clone)]
pub enum Rst {
    /// An ordered run of children, e.g. a whole source unit, one block
    /// element, or one tag argument.
    Sequence { children: Vec<Rst>, span: Span },
    /// Literal output text (plain text, verbatim-string content, whitespace,
    /// and textualized punctuation all land here).
    Text { text: String, span: Span },
    /// A decoded escape sequence: emit `character` `count` times.
    Escape {
        character: char,
        count: usize,
        span: Span,
    },
    /// A branching block: exactly one element is chosen at run time.
    Block { elements: Vec<Rst>, span: Span },
    /// A call to a registered built-in function.
    Function {
        name: String,
        signature: FunctionSignature,
        args: Vec<Rst>,
        span: Span,
    },
    /// A pattern replacer: runs `subject`, substitutes every match of
    /// `pattern` using `replacement`.
    Replacer {
        regex_source: String,
        pattern: Regex,
        subject: Box<Rst>,
        replacement: Box<Rst>,
        span: Span,
    },
    /// A subroutine definition, optionally exported into the unit's module.
    DefineSubroutine {
        name: String,
        /// Ordered parameter list; a repeated name keeps its last mode.
        parameters: Vec<(String, ParamMode)>,
        body: Box<Rst>,
        span: Span,
    },
    /// A subroutine invocation, optionally qualified with a module member.
    CallSubroutine {
        name: String,
        module_function: Option<String>,
        args: Vec<Rst>,
        span: Span,
    },
}

/// Combined span of a node slice, if non-empty.
pub fn slice_span(nodes: &[Rst]) -> Option<Span> {
    let first = nodes.first()?.span();
    let last = nodes.last().map_or(first, Rst::span);
    Some(first.merge(last))
}

impl Rst {
    /// Returns the source span of this node.
    pub fn span(&self) -> Span {
        use Rst::*;
        match self {
            Sequence { span, .. }
            | Text { span, .. }
            | Escape { span, .. }
            | Block { span, .. }
            | Function { span, .. }
            | Replacer { span, .. }
            | DefineSubroutine { span, .. }
            | CallSubroutine { span, .. } => *span,
        }
    }

    /// Pretty-prints the tree as a compact s-expression, mainly for the CLI
    /// and for test assertions.
    pub fn pretty(&self) -> String {
        use Rst::*;
        match self {
            Sequence { children, .. } => format!("(seq{})", Self::pretty_list(children)),
            Text { text, .. } => format!("{:?}", text),
            Escape {
                character, count, ..
            } => format!("(esc {:?} x{})", character, count),
            Block { elements, .. } => format!("(block{})", Self::pretty_list(elements)),
            Function { name, args, .. } => format!("(fn {}{})", name, Self::pretty_list(args)),
            Replacer {
                regex_source,
                subject,
                replacement,
                ..
            } => format!(
                "(replace `{}` {} {})",
                regex_source,
                subject.pretty(),
                replacement.pretty()
            ),
            DefineSubroutine {
                name,
                parameters,
                body,
                ..
            } => {
                let params = parameters
                    .iter()
                    .map(|(name, mode)| match mode {
                        ParamMode::Loose => format!("@{}", name),
                        ParamMode::Greedy => name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("(defsub {} [{}] {})", name, params, body.pretty())
            }
            CallSubroutine {
                name,
                module_function,
                args,
                ..
            } => {
                let qualified = match module_function {
                    Some(member) => format!("{}.{}", name, member),
                    None => name.clone(),
                };
                format!("(callsub {}{})", qualified, Self::pretty_list(args))
            }
        }
    }

    fn pretty_list(items: &[Rst]) -> String {
        items
            .iter()
            .map(|item| format!(" {}", item.pretty()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both_ranges() {
        let a = Span::new(3, 7);
        let b = Span::new(5, 12);
        assert_eq!(a.merge(b), Span::new(3, 12));
        assert_eq!(b.merge(a), Span::new(3, 12));
    }

    #[test]
    fn signature_accepts_range_and_variadic() {
        let fixed = FunctionSignature {
            name: "rep".into(),
            min_args: 1,
            max_args: Some(1),
        };
        assert!(fixed.accepts(1));
        assert!(!fixed.accepts(2));

        let variadic = FunctionSignature {
            name: "either".into(),
            min_args: 2,
            max_args: None,
        };
        assert!(variadic.accepts(2));
        assert!(variadic.accepts(9));
        assert!(!variadic.accepts(1));
    }
}
