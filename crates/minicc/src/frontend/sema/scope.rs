//! Name binding frames for the symbol table

use std::collections::HashMap;
use std::fmt;

use string_interner::{DefaultStringInterner, DefaultSymbol};

use super::symtab::SymbolId;

/// How names resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// One namespace for the whole program; the earliest binding wins
    #[default]
    Flat,
    /// Nested frames; lookup falls back from the innermost frame outward
    Lexical,
}

/// Stack of binding frames over interned names
///
/// Frame 0 is the global frame and is never popped. In flat mode it is the
/// only frame.
pub struct ScopeStack {
    mode: ScopeMode,
    names: DefaultStringInterner,
    frames: Vec<HashMap<DefaultSymbol, SymbolId>>,
}

impl ScopeStack {
    pub fn new(mode: ScopeMode) -> Self {
        Self {
            mode,
            names: DefaultStringInterner::default(),
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        if self.mode == ScopeMode::Lexical {
            self.frames.push(HashMap::new());
        }
    }

    pub fn pop(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Bind `name` in the innermost frame unless that frame already has it
    pub fn bind(&mut self, name: &str, id: SymbolId) {
        let key = self.names.get_or_intern(name);
        if let Some(frame) = self.frames.last_mut() {
            frame.entry(key).or_insert(id);
        }
    }

    /// Bind `name` in the global frame regardless of nesting
    pub fn bind_global(&mut self, name: &str, id: SymbolId) {
        let key = self.names.get_or_intern(name);
        self.frames[0].entry(key).or_insert(id);
    }

    pub fn resolve(&self, name: &str) -> Option<SymbolId> {
        let key = self.names.get(name)?;
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&key).copied())
    }
}

impl fmt::Debug for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStack")
            .field("mode", &self.mode)
            .field("depth", &self.frames.len())
            .field("names", &self.names.len())
            .finish()
    }
}
