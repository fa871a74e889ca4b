//! Append-only symbol table with array shapes

use std::fmt;

use tracing::debug;

use super::scope::{ScopeMode, ScopeStack};
use crate::common::{CompileError, CompileResult, Span};
use crate::types::TypeTag;

/// Default upper bound on the number of records, builtins included
pub const DEFAULT_MAX_SYMBOLS: usize = 1024;

/// Functions present in every table, seeded on the first registration
pub const BUILTINS: [&str; 3] = ["printchar", "printint", "printlong"];

/// Stable handle of a symbol record; its index in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub const PRINTCHAR: SymbolId = SymbolId(0);
    pub const PRINTINT: SymbolId = SymbolId(1);
    pub const PRINTLONG: SymbolId = SymbolId(2);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => f.pad("var"),
            SymbolKind::Function => f.pad("func"),
        }
    }
}

/// Dimension sizes of an array, outermost first; 0 means not yet known
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayShape {
    dims: Vec<usize>,
}

impl ArrayShape {
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn count(&self) -> usize {
        self.dims.len()
    }

    /// 1-indexed dimension
    pub fn get(&self, level: usize) -> Option<usize> {
        level.checked_sub(1).and_then(|i| self.dims.get(i)).copied()
    }

    /// Product of the sizes from `level` through the innermost dimension;
    /// `None` when the product does not fit in `usize`
    pub fn total_from(&self, level: usize) -> Option<usize> {
        let start = level.checked_sub(1)?;
        let tail = self.dims.get(start..).filter(|tail| !tail.is_empty())?;
        tail.iter().try_fold(1usize, |total, &dim| total.checked_mul(dim))
    }
}

/// One declared identifier
#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TypeTag,
    pub array: Option<ArrayShape>,
}

impl SymbolRecord {
    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }
}

/// Registry of every identifier seen during a compilation
///
/// Records are only ever appended; a [`SymbolId`] stays valid for the life
/// of the table. Lookup is flat (earliest registration wins) unless the table
/// was built with [`ScopeMode::Lexical`].
#[derive(Debug)]
pub struct SymbolTable {
    records: Vec<SymbolRecord>,
    scopes: ScopeStack,
    max_symbols: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::with_options(ScopeMode::Flat, DEFAULT_MAX_SYMBOLS)
    }

    pub fn with_options(mode: ScopeMode, max_symbols: usize) -> Self {
        Self {
            records: Vec::new(),
            scopes: ScopeStack::new(mode),
            max_symbols,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record and bind `name` to it
    ///
    /// The first call on a fresh table seeds the builtin print functions at
    /// handles 0-2 before storing the caller's symbol. Nothing is stored
    /// unless the builtins and the caller's symbol all fit.
    pub fn register(&mut self, name: &str, kind: SymbolKind, ty: TypeTag) -> CompileResult<SymbolId> {
        let needed = if self.records.is_empty() { BUILTINS.len() + 1 } else { 1 };
        if self.records.len() + needed > self.max_symbols {
            return Err(CompileError::Capacity { limit: self.max_symbols });
        }
        if self.records.is_empty() {
            for builtin in BUILTINS {
                let id = self.push(builtin, SymbolKind::Function, TypeTag::Void)?;
                self.scopes.bind_global(builtin, id);
            }
        }
        let id = self.push(name, kind, ty)?;
        self.scopes.bind(name, id);
        Ok(id)
    }

    fn push(&mut self, name: &str, kind: SymbolKind, ty: TypeTag) -> CompileResult<SymbolId> {
        if self.records.len() >= self.max_symbols {
            return Err(CompileError::Capacity { limit: self.max_symbols });
        }
        let id = SymbolId(self.records.len() as u32);
        self.records.push(SymbolRecord {
            name: name.to_string(),
            kind,
            ty,
            array: None,
        });
        debug!(name, id = id.index(), %kind, %ty, "symbol registered");
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.scopes.resolve(name)
    }

    /// Open a nested scope; no-op in flat mode
    pub fn push_scope(&mut self) {
        self.scopes.push();
    }

    /// Close the innermost scope; its records stay in the table
    pub fn pop_scope(&mut self) -> bool {
        self.scopes.pop()
    }

    pub fn get(&self, id: SymbolId) -> &SymbolRecord {
        &self.records[id.index()]
    }

    fn get_mut(&mut self, id: SymbolId) -> &mut SymbolRecord {
        &mut self.records[id.index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.get(id).name
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.get(id).kind
    }

    pub fn ty(&self, id: SymbolId) -> TypeTag {
        self.get(id).ty
    }

    pub fn set_type(&mut self, id: SymbolId, ty: TypeTag) {
        self.get_mut(id).ty = ty;
    }

    pub fn set_kind(&mut self, id: SymbolId, kind: SymbolKind) {
        self.get_mut(id).kind = kind;
    }

    pub fn array(&self, id: SymbolId) -> Option<&ArrayShape> {
        self.get(id).array.as_ref()
    }

    /// Append a dimension, creating the shape on first use
    pub fn add_dimension(&mut self, id: SymbolId, size: usize) {
        self.get_mut(id).array.get_or_insert_with(ArrayShape::default).dims.push(size);
    }

    pub fn dimension(&self, id: SymbolId, level: usize) -> Option<usize> {
        self.array(id).and_then(|shape| shape.get(level))
    }

    pub fn set_dimension(&mut self, id: SymbolId, level: usize, value: usize) -> CompileResult<()> {
        let record = self.get_mut(id);
        let slot = record
            .array
            .as_mut()
            .and_then(|shape| level.checked_sub(1).and_then(|i| shape.dims.get_mut(i)));
        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CompileError::array(
                format!("'{}' has no dimension {}", record.name, level),
                Span::default(),
            )),
        }
    }

    pub fn dimension_count(&self, id: SymbolId) -> usize {
        self.array(id).map_or(0, ArrayShape::count)
    }

    /// Elements covered by dimensions `from_level..`; zero while any is unresolved
    pub fn total_elements(&self, id: SymbolId, from_level: usize) -> Option<usize> {
        self.array(id).and_then(|shape| shape.total_from(from_level))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (SymbolId(i as u32), record))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, record) in self.iter() {
            write!(f, "{:>4} {:<16} {:<4} {}", id.index(), record.name, record.kind, record.ty)?;
            if let Some(shape) = &record.array {
                f.write_str(" (")?;
                for dim in shape.dims() {
                    write!(f, "{},", dim)?;
                }
                f.write_str(")")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_registration_seeds_builtins() {
        let mut table = SymbolTable::new();
        assert!(table.is_empty());
        assert_eq!(table.lookup("printint"), None);

        let x = table.register("x", SymbolKind::Variable, TypeTag::Int).unwrap();
        assert_eq!(x.index(), 3);

        for (id, name) in [SymbolId::PRINTCHAR, SymbolId::PRINTINT, SymbolId::PRINTLONG]
            .into_iter()
            .zip(BUILTINS)
        {
            assert_eq!(table.name(id), name);
            assert_eq!(table.kind(id), SymbolKind::Function);
            assert_eq!(table.ty(id), TypeTag::Void);
            assert_eq!(table.lookup(name), Some(id));
        }

        let y = table.register("y", SymbolKind::Variable, TypeTag::Long).unwrap();
        assert_eq!(y.index(), 4);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_builtins_seeded_even_for_builtin_name() {
        let mut table = SymbolTable::new();
        let id = table.register("printint", SymbolKind::Variable, TypeTag::Int).unwrap();
        assert_eq!(id.index(), 3);
        assert_eq!(table.lookup("printint"), Some(SymbolId::PRINTINT));
    }

    #[test]
    fn test_lookup_earliest_registration_wins() {
        let mut table = SymbolTable::new();
        let first = table.register("n", SymbolKind::Variable, TypeTag::Int).unwrap();
        let second = table.register("n", SymbolKind::Variable, TypeTag::Char).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.lookup("n"), Some(first));
        assert_eq!(table.lookup("missing"), None);
    }

    #[test]
    fn test_set_type_and_kind_overwrite() {
        let mut table = SymbolTable::new();
        let f = table.register("f", SymbolKind::Function, TypeTag::Int).unwrap();
        table.set_type(f, TypeTag::LongPtr);
        table.set_kind(f, SymbolKind::Variable);
        assert_eq!(table.ty(f), TypeTag::LongPtr);
        assert_eq!(table.kind(f), SymbolKind::Variable);
    }

    #[test]
    fn test_capacity_counts_builtins() {
        let mut table = SymbolTable::with_options(ScopeMode::Flat, 5);
        table.register("a", SymbolKind::Variable, TypeTag::Int).unwrap();
        table.register("b", SymbolKind::Variable, TypeTag::Int).unwrap();
        let err = table.register("c", SymbolKind::Variable, TypeTag::Int).unwrap_err();
        assert!(matches!(err, CompileError::Capacity { limit: 5 }));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_capacity_below_builtins_stores_nothing() {
        for limit in 0..=BUILTINS.len() {
            let mut table = SymbolTable::with_options(ScopeMode::Flat, limit);
            let err = table.register("a", SymbolKind::Variable, TypeTag::Int).unwrap_err();
            assert!(matches!(err, CompileError::Capacity { limit: l } if l == limit));
            assert!(table.is_empty());
            assert_eq!(table.lookup("printchar"), None);
        }

        let mut table = SymbolTable::with_options(ScopeMode::Flat, BUILTINS.len() + 1);
        let a = table.register("a", SymbolKind::Variable, TypeTag::Int).unwrap();
        assert_eq!(a.index(), 3);
        assert_eq!(table.lookup("printlong"), Some(SymbolId::PRINTLONG));
    }

    #[test]
    fn test_dimensions_accumulate_in_order() {
        let mut table = SymbolTable::new();
        let a = table.register("a", SymbolKind::Variable, TypeTag::Int).unwrap();
        assert_eq!(table.dimension_count(a), 0);
        assert!(table.array(a).is_none());

        table.add_dimension(a, 2);
        table.add_dimension(a, 3);
        table.add_dimension(a, 4);

        assert_eq!(table.dimension_count(a), 3);
        assert_eq!(table.array(a).unwrap().dims(), &[2, 3, 4]);
        assert_eq!(table.dimension(a, 1), Some(2));
        assert_eq!(table.dimension(a, 3), Some(4));
        assert_eq!(table.dimension(a, 0), None);
        assert_eq!(table.dimension(a, 4), None);
    }

    #[test]
    fn test_set_dimension_in_and_out_of_range() {
        let mut table = SymbolTable::new();
        let a = table.register("a", SymbolKind::Variable, TypeTag::Char).unwrap();
        table.add_dimension(a, 0);
        table.add_dimension(a, 5);

        table.set_dimension(a, 1, 7).unwrap();
        assert_eq!(table.dimension(a, 1), Some(7));
        assert_eq!(table.dimension(a, 2), Some(5));

        let err = table.set_dimension(a, 3, 1).unwrap_err();
        assert!(matches!(err, CompileError::ArrayDimension { .. }));
        assert!(table.set_dimension(a, 0, 1).is_err());
    }

    #[test]
    fn test_total_elements() {
        let mut table = SymbolTable::new();
        let a = table.register("a", SymbolKind::Variable, TypeTag::Int).unwrap();
        table.add_dimension(a, 2);
        table.add_dimension(a, 3);
        table.add_dimension(a, 4);

        assert_eq!(table.total_elements(a, 1), Some(24));
        assert_eq!(table.total_elements(a, 2), Some(12));
        assert_eq!(table.total_elements(a, 3), Some(4));
        assert_eq!(table.total_elements(a, 4), None);
        assert_eq!(table.total_elements(a, 0), None);

        table.set_dimension(a, 1, 0).unwrap();
        assert_eq!(table.total_elements(a, 1), Some(0));
        assert_eq!(table.total_elements(a, 2), Some(12));
    }

    #[test]
    fn test_total_elements_overflow_is_none() {
        let mut table = SymbolTable::new();
        let big = table.register("big", SymbolKind::Variable, TypeTag::Int).unwrap();
        for _ in 0..5 {
            table.add_dimension(big, 65536);
        }

        assert_eq!(table.total_elements(big, 1), None);
        assert_eq!(table.total_elements(big, 5), Some(65536));
    }

    #[test]
    fn test_display_lists_dimensions() {
        let mut table = SymbolTable::new();
        let m = table.register("m", SymbolKind::Variable, TypeTag::Long).unwrap();
        table.add_dimension(m, 2);
        table.add_dimension(m, 3);

        let text = table.to_string();
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("   3 m"), "{last}");
        assert!(last.ends_with("var  long (2,3,)"), "{last}");
        assert_eq!(text.lines().count(), 4);
    }
}
