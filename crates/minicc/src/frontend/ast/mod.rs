//! Syntax tree definitions

mod node;
mod ops;

pub use node::*;
pub use ops::*;

/// A complete source file: its top-level declarations in order
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub declarations: Vec<TreeNode>,
}

impl TranslationUnit {
    pub fn new(declarations: Vec<TreeNode>) -> Self {
        Self { declarations }
    }
}

impl std::fmt::Display for TranslationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for decl in &self.declarations {
            write!(f, "{}", decl)?;
        }
        Ok(())
    }
}
