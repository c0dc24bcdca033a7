//! Type system for the Slate language.
//!
//! This module defines the built-in types and the compatibility rules
//! between them. It is intentionally self-contained and does not
//! depend on parsing or code generation.

use std::fmt;

/// Represents the types of values and expressions in Slate.
///
/// The scalar types come straight from the type marks in the surface
/// grammar. Arrays carry their bound because two arrays are the same
/// type only when both the element type and the bound agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Integer,
    Float,
    Bool,
    String,
    /// Fixed-size array of a scalar element type.
    Array(Box<Type>, i64),
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    /// Element type of an array, `None` for scalars.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(element, _) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Array(element, bound) => write!(f, "{element}[{bound}]"),
        }
    }
}

/// True when a value of type `from` can be stored into a slot of type
/// `to`.
///
/// The only implicit conversion in the language is widening an
/// integer into a float slot. Everything else requires equal types,
/// arrays included (same element type and same bound).
pub fn assignable(from: &Type, to: &Type) -> bool {
    from == to || (*from == Type::Integer && *to == Type::Float)
}

/// Result type of an arithmetic operator over two operands, `None`
/// when either operand is not numeric.
pub fn arithmetic_result(lhs: &Type, rhs: &Type) -> Option<Type> {
    match (lhs, rhs) {
        (Type::Integer, Type::Integer) => Some(Type::Integer),
        (Type::Integer, Type::Float) | (Type::Float, Type::Integer) | (Type::Float, Type::Float) => {
            Some(Type::Float)
        }
        _ => None,
    }
}
