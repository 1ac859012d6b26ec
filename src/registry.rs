//! # Patter Function Registry
//!
//! Lookup surface the compiler consults when it parses a function tag. The
//! registry answers two questions and nothing more: does a function with this
//! name exist at all, and does it have an overload accepting a given argument
//! count. Resolution of what a function *does* happens at runtime and is none
//! of the compiler's business.
//!
//! Registry Invariant: the compiler never constructs its own registry. One is
//! passed in by reference so embedders can compile against their own function
//! sets; [`standard_registry`] provides the built-in table.
//!
//! Function names are case-insensitive. Aliases share one signature, so
//! `[r:2]` and `[rep:2]` resolve identically.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::syntax::FunctionSignature;

/// Compile-time function lookup.
pub trait FunctionRegistry {
    /// True if any overload of `name` exists.
    fn function_exists(&self, name: &str) -> bool;

    /// The signature of `name` accepting exactly `arg_count` arguments, if any.
    fn get_function(&self, name: &str, arg_count: usize) -> Option<&FunctionSignature>;
}

/// Table-backed registry used for the built-in function set and for tests.
#[derive(Debug, Default, Clone)]
pub struct StandardRegistry {
    functions: HashMap<String, FunctionSignature>,
}

impl StandardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function accepting between `min_args` and `max_args`
    /// arguments; `None` means no upper bound. Later registrations under the
    /// same name replace earlier ones.
    pub fn register(&mut self, name: &str, min_args: usize, max_args: Option<usize>) {
        self.functions.insert(
            name.to_lowercase(),
            FunctionSignature::new(name, min_args, max_args),
        );
    }

    /// Register `alias` to resolve to the same signature as `canonical`.
    pub fn alias(&mut self, alias: &str, canonical: &str) {
        if let Some(sig) = self.functions.get(&canonical.to_lowercase()).cloned() {
            self.functions.insert(alias.to_lowercase(), sig);
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    /// The signature registered under `name`, regardless of arity.
    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// The built-in function table.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("case", 1, Some(1));
        registry.register("chance", 1, Some(1));
        registry.register("end", 1, Some(1));
        registry.register("first", 1, Some(1));
        registry.register("last", 1, Some(1));
        registry.register("num", 2, Some(2));
        registry.register("rep", 1, Some(1));
        registry.register("repcount", 0, Some(0));
        registry.register("repnum", 0, Some(0));
        registry.register("sep", 1, Some(2));
        registry.alias("caps", "case");
        registry.alias("n", "num");
        registry.alias("r", "rep");
        registry.alias("rc", "repcount");
        registry.alias("rn", "repnum");
        registry.alias("s", "sep");
        registry
    }
}

impl FunctionRegistry for StandardRegistry {
    fn function_exists(&self, name: &str) -> bool {
        self.has(name)
    }

    fn get_function(&self, name: &str, arg_count: usize) -> Option<&FunctionSignature> {
        self.functions
            .get(&name.to_lowercase())
            .filter(|sig| sig.accepts(arg_count))
    }
}

static STANDARD: Lazy<StandardRegistry> = Lazy::new(StandardRegistry::standard);

/// Shared instance of the built-in function table.
pub fn standard_registry() -> &'static StandardRegistry {
    &STANDARD
}
