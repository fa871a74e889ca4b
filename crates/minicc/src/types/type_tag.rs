//! Scalar and pointer type tags
//!
//! The pointer variants sit directly after the scalar variants and in the
//! same relative order, so pointer classification is a range test and
//! pointer/pointee conversion is an index offset of [`SCALAR_COUNT`].
//! Adding a scalar means adding its pointer variant at the matching position.

use std::fmt;

use crate::common::{CompileError, CompileResult};

/// Type tag attached to symbols and tree nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    Void,
    Char,
    Int,
    Long,
    VoidPtr,
    CharPtr,
    IntPtr,
    LongPtr,
}

/// Number of scalar tags; also the offset from a scalar to its pointer
pub const SCALAR_COUNT: usize = 4;

impl TypeTag {
    /// Every tag in discriminant order
    pub const ALL: [TypeTag; 2 * SCALAR_COUNT] = [
        TypeTag::Void,
        TypeTag::Char,
        TypeTag::Int,
        TypeTag::Long,
        TypeTag::VoidPtr,
        TypeTag::CharPtr,
        TypeTag::IntPtr,
        TypeTag::LongPtr,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn is_void(self) -> bool {
        self == TypeTag::Void
    }

    pub fn is_pointer(self) -> bool {
        (TypeTag::VoidPtr.index()..=TypeTag::LongPtr.index()).contains(&self.index())
    }

    pub fn is_scalar(self) -> bool {
        !self.is_pointer()
    }

    /// Integer family that takes part in pointer-arithmetic scaling
    pub fn is_integer(self) -> bool {
        matches!(self, TypeTag::Int | TypeTag::Long)
    }

    /// Pointer type whose pointee is `self`
    pub fn pointer_to(self) -> CompileResult<TypeTag> {
        if self.is_pointer() {
            return Err(CompileError::type_mapping(format!(
                "unrecognized type {} to point to",
                self
            )));
        }
        Self::from_index(self.index() + SCALAR_COUNT).ok_or_else(|| {
            CompileError::type_mapping(format!("unrecognized type {} to point to", self))
        })
    }

    /// Pointee type of a pointer
    pub fn value_at(self) -> CompileResult<TypeTag> {
        if !self.is_pointer() {
            return Err(CompileError::type_mapping(format!(
                "unrecognized type {} to dereference",
                self
            )));
        }
        Self::from_index(self.index() - SCALAR_COUNT).ok_or_else(|| {
            CompileError::type_mapping(format!("unrecognized type {} to dereference", self))
        })
    }

    /// Factor applied to an integer literal added to a pointer of this type
    pub fn scale_size(self) -> i64 {
        match self {
            TypeTag::IntPtr => 4,
            TypeTag::LongPtr => 8,
            _ => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Void => "void",
            TypeTag::Char => "char",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::VoidPtr => "void*",
            TypeTag::CharPtr => "char*",
            TypeTag::IntPtr => "int*",
            TypeTag::LongPtr => "long*",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
