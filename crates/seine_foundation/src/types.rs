//! Type descriptors for fact schema validation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Type descriptor for schema validation.
///
/// Used to declare fact field types and validate values when a fact is
/// committed to working memory.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// The nil type (only value: nil).
    Nil,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// String type.
    String,
    /// Symbol type (bare identifier atom).
    Symbol,
    /// Homogeneous vector type.
    Vec(Box<Type>),
    /// Homogeneous set type.
    Set(Box<Type>),
    /// Homogeneous map type.
    Map(Box<Type>, Box<Type>),
    /// Optional type (value or nil).
    Option(Box<Type>),
    /// Any type (accepts any value).
    Any,
}

impl Type {
    /// Creates a vector type with the given element type.
    #[must_use]
    pub fn vec(element: Type) -> Self {
        Self::Vec(Box::new(element))
    }

    /// Creates a set type with the given element type.
    #[must_use]
    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    /// Creates a map type with the given key and value types.
    #[must_use]
    pub fn map(key: Type, value: Type) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Creates an optional type.
    #[must_use]
    pub fn option(inner: Type) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Returns true if this type is `Any`.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Checks whether a concrete value inhabits this type.
    ///
    /// Collections are checked element by element; `Float` accepts integers
    /// (numeric promotion), `Option(T)` accepts nil.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::Nil, Value::Nil)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int | Self::Float, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::String, Value::String(_))
            | (Self::Symbol, Value::Symbol(_)) => true,
            (Self::Option(inner), v) => v.is_nil() || inner.admits(v),
            (Self::Vec(elem), Value::Vec(items)) => items.iter().all(|v| elem.admits(v)),
            (Self::Set(elem), Value::Set(items)) => items.iter().all(|v| elem.admits(v)),
            (Self::Map(k, v), Value::Map(entries)) => entries
                .iter()
                .all(|(key, value)| k.admits(key) && v.admits(value)),
            _ => false,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Symbol => write!(f, "symbol"),
            Self::Vec(elem) => write!(f, "vec<{elem}>"),
            Self::Set(elem) => write!(f, "set<{elem}>"),
            Self::Map(k, v) => write!(f, "map<{k}, {v}>"),
            Self::Option(inner) => write!(f, "option<{inner}>"),
            Self::Any => write!(f, "any"),
        }
    }
}
