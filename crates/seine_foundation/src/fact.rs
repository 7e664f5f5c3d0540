//! Facts: typed records that live in working memory.
//!
//! A fact maps field keys (positional indices or names) to values. It is
//! mutable only until it is committed to working memory and receives a
//! [`FactId`]; after that it is frozen and "modification" always means
//! retracting it and declaring an edited copy.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collections::FrozenMap;
use crate::error::{Error, ErrorKind, Result};
use crate::schema::FactType;
use crate::value::Value;

/// Identity of a committed fact.
///
/// Assigned from a strictly increasing counter at commit time and never
/// reused until working memory is reset.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactId(u64);

impl FactId {
    /// Creates a fact id from its raw index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f-{}", self.0)
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f-{}", self.0)
    }
}

/// Key of a fact field: a zero-based position or a name.
///
/// Positional keys sort before named keys.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldKey {
    /// Positional field.
    Index(usize),
    /// Named field.
    Name(Arc<str>),
}

impl FieldKey {
    /// Returns true if the key contains the reserved nested accessor marker.
    ///
    /// The marker is a double underscore inside the name once leading and
    /// trailing underscores are ignored (`a__b` is reserved, `__a` is not).
    #[must_use]
    pub fn is_nested_accessor(&self) -> bool {
        match self {
            Self::Index(_) => false,
            Self::Name(name) => name.trim_matches('_').contains("__"),
        }
    }

    /// Returns the name of a named key.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl From<usize> for FieldKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::Name(name.into())
    }
}

impl From<Arc<str>> for FieldKey {
    fn from(name: Arc<str>) -> Self {
        Self::Name(name)
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A typed record of field values.
///
/// Equality and hashing consider the concrete fact type and the full field
/// mapping; the identity assigned at commit time is not part of it.
#[derive(Clone)]
pub struct Fact {
    fact_type: FactType,
    fields: FrozenMap<FieldKey, Value>,
    id: Option<FactId>,
}

impl Fact {
    /// Creates an empty fact of the given type.
    #[must_use]
    pub fn new(fact_type: &FactType) -> Self {
        Self {
            fact_type: fact_type.clone(),
            fields: FrozenMap::new(),
            id: None,
        }
    }

    /// Creates an empty fact of the root type.
    #[must_use]
    pub fn root() -> Self {
        Self::new(&FactType::fact())
    }

    /// Creates the sentinel fact declared on every reset.
    #[must_use]
    pub fn initial() -> Self {
        Self::new(&FactType::initial_fact())
    }

    /// Builder method to set a field before commit.
    #[must_use]
    pub fn with(mut self, key: impl Into<FieldKey>, value: impl Into<Value>) -> Self {
        self.fields = self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder method to append positional fields after the last index used.
    #[must_use]
    pub fn with_positional<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut next = self.next_index();
        for value in values {
            self.fields = self.fields.insert(FieldKey::Index(next), value.into());
            next += 1;
        }
        self
    }

    /// Sets a field.
    ///
    /// # Errors
    /// Returns `FrozenFact` once the fact has been committed.
    pub fn set(&mut self, key: impl Into<FieldKey>, value: impl Into<Value>) -> Result<()> {
        if let Some(id) = self.id {
            return Err(Error::frozen_fact(id));
        }
        self.fields = self.fields.insert(key.into(), value.into());
        Ok(())
    }

    /// Returns the concrete fact type.
    #[must_use]
    pub fn fact_type(&self) -> &FactType {
        &self.fact_type
    }

    /// Returns the identity, if committed.
    #[must_use]
    pub fn id(&self) -> Option<FactId> {
        self.id
    }

    /// Returns true once the fact has been committed to working memory.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.id.is_some()
    }

    /// Reads a field, falling back to the schema default when absent.
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&Value> {
        self.fields.get(key).or_else(|| {
            self.fact_type
                .field(key)
                .and_then(|schema| schema.default.as_ref())
        })
    }

    /// Reads a named field.
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.get(&FieldKey::from(name))
    }

    /// Reads a positional field.
    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.get(&FieldKey::Index(index))
    }

    /// Returns true if the field is explicitly set (defaults do not count).
    #[must_use]
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterates over explicitly set fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldKey, &Value)> {
        self.fields.iter()
    }

    /// Returns the number of explicitly set fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an uncommitted copy with the given overrides applied.
    #[must_use]
    pub fn copy_with<I, K, V>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldKey>,
        V: Into<Value>,
    {
        let mut fields = self.fields.clone();
        for (key, value) in changes {
            fields = fields.insert(key.into(), value.into());
        }
        Self {
            fact_type: self.fact_type.clone(),
            fields,
            id: None,
        }
    }

    /// Returns true if any field key uses the reserved nested accessor marker.
    #[must_use]
    pub fn has_nested_accessor(&self) -> bool {
        self.fields.keys().any(FieldKey::is_nested_accessor)
    }

    /// Checks the fact against its key rules and effective schema.
    ///
    /// # Errors
    /// `NestedAccessorKey` for reserved keys, `MissingField` when a mandatory
    /// field is absent, `InvalidField` when a value has the wrong type.
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.fields.keys().find(|k| k.is_nested_accessor()) {
            return Err(Error::nested_accessor_key(key.to_string()));
        }
        for schema in self.fact_type.fields() {
            match self.fields.get(&schema.key) {
                Some(value) if !schema.ty.admits(value) => {
                    return Err(Error::new(ErrorKind::InvalidField {
                        fact_type: self.fact_type.name().to_string(),
                        field: schema.key.to_string(),
                        expected: schema.ty.clone(),
                        actual: value.value_type(),
                    }));
                }
                None if schema.mandatory => {
                    return Err(Error::new(ErrorKind::MissingField {
                        fact_type: self.fact_type.name().to_string(),
                        field: schema.key.to_string(),
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Freezes the fact under the given identity.
    ///
    /// Called by working memory at commit time; the returned fact rejects
    /// every later [`Fact::set`].
    #[must_use]
    pub fn committed(mut self, id: FactId) -> Self {
        self.id = Some(id);
        self
    }

    fn next_index(&self) -> usize {
        self.fields
            .keys()
            .filter_map(|k| match k {
                FieldKey::Index(i) => Some(i + 1),
                FieldKey::Name(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.fact_type == other.fact_type && self.fields == other.fields
    }
}

impl Eq for Fact {}

impl Hash for Fact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fact_type.hash(state);
        self.fields.hash(state);
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.fact_type)?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match key {
                FieldKey::Index(_) => write!(f, "{value:?}")?,
                FieldKey::Name(name) => write!(f, "{name}={value:?}")?,
            }
        }
        write!(f, ")")
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "<{id}>"),
            None => write!(f, "<Undeclared Fact> {self:?}"),
        }
    }
}
