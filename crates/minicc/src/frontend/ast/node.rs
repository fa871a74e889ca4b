//! Syntax tree nodes
//!
//! Sequences (statements of a block, elements of an initializer, parameters,
//! call arguments) are sibling chains: the owning node's first child heads the
//! chain and each element links to the next through `sibling`.

use std::fmt;

use super::{BinaryOp, UnaryOp};
use crate::common::Span;
use crate::frontend::sema::SymbolId;
use crate::types::TypeTag;

/// What a node is; the token or operator it was reduced from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    // Declarations
    /// children: [TypeSpec, ParamList, Compound]
    FuncDecl,
    /// Declared return type of a function
    TypeSpec,
    ParamList,
    Param,
    /// children: [initializer expression] when initialized
    VarDecl,
    /// children: [InitList] when initialized
    ArrayDecl,
    InitList,

    // Statements
    Compound,
    /// children: [condition, then, else?]
    If,
    /// children: [condition, body]
    While,
    /// children: [value] when a value is returned
    Return,
    Empty,

    // Expressions
    Num,
    Id,
    Assign,
    Binary(BinaryOp),
    Unary(UnaryOp),
    /// children: [base, index]
    Index,
    /// children: [first argument] when arguments are present
    Call,
}

impl NodeKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, NodeKind::Num)
    }

    pub fn is_return(&self) -> bool {
        matches!(self, NodeKind::Return)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Binary(op) => write!(f, "Binary {}", op.as_str()),
            NodeKind::Unary(op) => write!(f, "Unary {}", op.as_str()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub ty: TypeTag,
    /// Literal value for `Num` nodes
    pub value: i64,
    pub id: Option<SymbolId>,
    pub children: Vec<TreeNode>,
    pub sibling: Option<Box<TreeNode>>,
    pub span: Span,
}

impl TreeNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            ty: TypeTag::Void,
            value: 0,
            id: None,
            children: Vec::new(),
            sibling: None,
            span,
        }
    }

    /// Integer literal
    pub fn num(value: i64, ty: TypeTag, span: Span) -> Self {
        Self::new(NodeKind::Num, span).with_type(ty).with_value(value)
    }

    /// Node whose first child heads a sibling chain of `items`
    pub fn list(kind: NodeKind, items: Vec<TreeNode>, span: Span) -> Self {
        let mut node = Self::new(kind, span);
        node.children.extend(chain(items));
        node
    }

    pub fn with_type(mut self, ty: TypeTag) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    pub fn with_id(mut self, id: SymbolId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, index: usize) -> Option<&TreeNode> {
        self.children.get(index)
    }

    pub fn is_literal(&self) -> bool {
        self.kind.is_literal()
    }

    /// This node followed by every node reachable through `sibling`
    pub fn siblings(&self) -> Siblings<'_> {
        Siblings { next: Some(self) }
    }

    /// Final node of the sibling chain starting here
    pub fn last_sibling(&self) -> &TreeNode {
        let mut node = self;
        while let Some(next) = node.sibling.as_deref() {
            node = next;
        }
        node
    }
}

/// Link `nodes` into a sibling chain, returning its head
pub fn chain(nodes: Vec<TreeNode>) -> Option<TreeNode> {
    nodes.into_iter().rev().fold(None, |next, mut node| {
        node.sibling = next.map(Box::new);
        Some(node)
    })
}

/// Iterator over a sibling chain
pub struct Siblings<'a> {
    next: Option<&'a TreeNode>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.sibling.as_deref();
        Some(node)
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, self, 0)
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, head: &TreeNode, depth: usize) -> fmt::Result {
    for node in head.siblings() {
        write!(f, "{:indent$}{}", "", node.kind, indent = depth * 2)?;
        match node.kind {
            NodeKind::Num => write!(f, " {}", node.value)?,
            _ => {
                if let Some(id) = node.id {
                    write!(f, " #{}", id.index())?;
                }
            }
        }
        writeln!(f, " : {}", node.ty)?;
        for child in &node.children {
            write_chain(f, child, depth + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stmt(kind: NodeKind) -> TreeNode {
        TreeNode::new(kind, Span::default())
    }

    #[test]
    fn test_chain_links_in_order() {
        let head = chain(vec![
            TreeNode::num(1, TypeTag::Int, Span::default()),
            TreeNode::num(2, TypeTag::Int, Span::default()),
            TreeNode::num(3, TypeTag::Int, Span::default()),
        ])
        .unwrap();

        let values: Vec<i64> = head.siblings().map(|n| n.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(head.last_sibling().value, 3);
    }

    #[test]
    fn test_chain_of_nothing() {
        assert!(chain(Vec::new()).is_none());
        let block = TreeNode::list(NodeKind::Compound, Vec::new(), Span::default());
        assert!(block.child(0).is_none());
    }

    #[test]
    fn test_last_sibling_of_single_node() {
        let ret = stmt(NodeKind::Return);
        assert!(ret.last_sibling().kind.is_return());
    }

    #[test]
    fn test_display_indents_children() {
        let assign = stmt(NodeKind::Assign)
            .with_type(TypeTag::Int)
            .with_child(TreeNode::num(7, TypeTag::Int, Span::default()));
        let text = assign.to_string();
        assert_eq!(text, "Assign : int\n  Num 7 : int\n");
    }
}
