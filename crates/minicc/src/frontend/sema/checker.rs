//! Type rules applied while the tree is built
//!
//! Every check is a free function over nodes and the symbol table. The
//! parser calls them as it reduces each construct; the only state that
//! survives between calls lives in the [`SymbolTable`].

use tracing::{debug, trace};

use super::symtab::{SymbolId, SymbolTable};
use crate::common::{CompileError, CompileResult};
use crate::frontend::ast::{NodeKind, TreeNode};
use crate::types::TypeTag;

/// Two types may meet in an assignment, comparison or arithmetic expression
/// unless one of them is void
pub fn is_compatible(t1: TypeTag, t2: TypeTag) -> bool {
    !t1.is_void() && !t2.is_void()
}

pub fn check_assign(lhs: &TreeNode, rhs: &TreeNode) -> CompileResult<()> {
    if !is_compatible(lhs.ty, rhs.ty) {
        return Err(CompileError::type_error(
            "assign between two types that are not compatible",
            lhs.span.merge(rhs.span),
        ));
    }
    Ok(())
}

pub fn check_compare(n1: &TreeNode, n2: &TreeNode) -> CompileResult<()> {
    if !is_compatible(n1.ty, n2.ty) {
        return Err(CompileError::type_error(
            "wrong types for comparison",
            n1.span.merge(n2.span),
        ));
    }
    Ok(())
}

pub fn check_arithmetic_compatible(n1: &TreeNode, n2: &TreeNode) -> CompileResult<()> {
    if !is_compatible(n1.ty, n2.ty) {
        return Err(CompileError::type_error(
            "wrong types for arithmetic calculation",
            n1.span.merge(n2.span),
        ));
    }
    Ok(())
}

/// Scale an integer literal that is added to or subtracted from a pointer
/// by the size of the pointee
///
/// Only `Num` nodes are rewritten. Returns whether a value changed.
pub fn scale_pointer_operand(n1: &mut TreeNode, n2: &mut TreeNode) -> bool {
    let (pointer, offset) = if n1.ty.is_pointer() && n2.ty.is_integer() {
        (n1.ty, n2)
    } else if n1.ty.is_integer() && n2.ty.is_pointer() {
        (n2.ty, n1)
    } else {
        return false;
    };

    if !offset.is_literal() {
        return false;
    }

    let scaled = offset.value.wrapping_mul(pointer.scale_size());
    trace!(from = offset.value, to = scaled, %pointer, "scaled pointer offset");
    offset.value = scaled;
    true
}

/// Compatibility check for `+`/`-` followed by literal scaling
pub fn check_arithmetic(n1: &mut TreeNode, n2: &mut TreeNode) -> CompileResult<()> {
    check_arithmetic_compatible(n1, n2)?;
    scale_pointer_operand(n1, n2);
    Ok(())
}

/// Compare the declared return type with the body's last statement
///
/// `body` is the head of the body's statement chain, `None` for an empty
/// body. Only the trailing statement is inspected: a return nested in a
/// branch does not count.
pub fn check_function_return(
    decl_type: &TreeNode,
    body: Option<&TreeNode>,
    func: SymbolId,
    symbols: &SymbolTable,
) -> CompileResult<()> {
    let last = body.map(TreeNode::last_sibling);
    let ends_with_return = last.is_some_and(|stmt| stmt.kind.is_return());
    let span = last.map_or(decl_type.span, |stmt| stmt.span);
    let name = symbols.name(func);

    if decl_type.ty.is_void() && ends_with_return {
        return Err(CompileError::return_error(
            name,
            format!("return statement in void function {}", name),
            span,
        ));
    }
    if !decl_type.ty.is_void() && !ends_with_return {
        return Err(CompileError::return_error(
            name,
            format!("missing return statement in function {}", name),
            span,
        ));
    }
    Ok(())
}

/// Fill in an omitted outermost array dimension from the initializer
///
/// `decl` is the array declaration node: its `id` names the array and its
/// first child, when present, is the initializer list. A one-dimensional
/// array counts every element; a multi-dimensional one counts only the
/// nested groups, skipping bare literals.
pub fn infer_first_dimension(decl: &TreeNode, symbols: &mut SymbolTable) -> CompileResult<()> {
    let Some(id) = decl.id else {
        return Err(CompileError::array("array declaration without a symbol", decl.span));
    };
    let Some(first) = symbols.dimension(id, 1) else {
        return Err(CompileError::array(
            format!("'{}' is not an array", symbols.name(id)),
            decl.span,
        ));
    };
    if first != 0 {
        return Ok(());
    }

    let Some(elements) = decl
        .child(0)
        .filter(|init| init.kind == NodeKind::InitList)
        .and_then(|init| init.child(0))
    else {
        return Err(CompileError::array("array size cannot be guessed", decl.span));
    };

    let flat = symbols.dimension_count(id) == 1;
    let count = elements
        .siblings()
        .filter(|element| flat || !element.is_literal())
        .count();

    if count == 0 {
        return Err(CompileError::array(
            "array size cannot be guessed from an initializer without nested groups",
            decl.span,
        ));
    }

    symbols
        .set_dimension(id, 1, count)
        .map_err(|_| CompileError::array("array size cannot be guessed", decl.span))?;
    debug!(array = symbols.name(id), size = count, "inferred first dimension");
    Ok(())
}
