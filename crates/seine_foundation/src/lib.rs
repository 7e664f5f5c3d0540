//! Core values, fact types, and facts for Seine.
//!
//! This crate provides:
//! - [`Value`] - The value type held in fact fields
//! - [`Fact`] and [`FactId`] - Typed records and their identities
//! - [`FactType`] - Fact type descriptors with schemas and inheritance
//! - [`Type`] - Type descriptors for schema validation
//! - [`Error`] - Categorized error types with context
//! - Persistent collections ([`FrozenVec`], [`FrozenSet`], [`FrozenMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod error;
pub mod fact;
pub mod schema;
pub mod types;
pub mod value;

pub use collections::{FrozenMap, FrozenSet, FrozenVec};
pub use error::{Error, ErrorCategory, ErrorContext, ErrorKind, Result};
pub use fact::{Fact, FactId, FieldKey};
pub use schema::{
    FACT_TYPE_NAME, FactType, FactTypeBuilder, FactTypeRegistry, FieldSchema,
    INITIAL_FACT_TYPE_NAME,
};
pub use types::Type;
pub use value::Value;
