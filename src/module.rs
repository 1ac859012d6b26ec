//! Module function table built during compilation.
//!
//! A source file becomes a module the moment it defines a subroutine with a
//! leading period (`$[.name:...]`). Those definitions are recorded here as
//! well as in the syntax tree, so other programs can import the compiled
//! module and call its functions by name.

use std::collections::HashMap;

use crate::syntax::Rst;

/// Named subroutines exported by a compiled program.
#[derive(Debug, Default, Clone)]
pub struct Module {
    functions: HashMap<String, Rst>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `subroutine` (a definition node) under `name`. A repeated name
    /// replaces the earlier definition.
    pub fn add_action_function(&mut self, name: &str, subroutine: Rst) {
        self.functions.insert(name.to_string(), subroutine);
    }

    pub fn get(&self, name: &str) -> Option<&Rst> {
        self.functions.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
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
}
