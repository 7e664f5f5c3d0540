//! Fact type descriptors and their field schemas.
//!
//! Every fact has a concrete [`FactType`]. Types form a single-inheritance
//! tree rooted at [`FactType::fact`]; a subtype's effective schema is its
//! parent's effective schema extended by its own fields, computed once when
//! the type is built and cached in the shared descriptor.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use crate::error::{Error, ErrorKind, Result};
use crate::fact::FieldKey;
use crate::types::Type;
use crate::value::Value;

/// Name of the root fact type.
pub const FACT_TYPE_NAME: &str = "Fact";

/// Name of the sentinel fact type declared on every reset.
pub const INITIAL_FACT_TYPE_NAME: &str = "InitialFact";

static ROOT: LazyLock<FactType> = LazyLock::new(|| FactTypeBuilder::new(FACT_TYPE_NAME).build_root());

static INITIAL: LazyLock<FactType> =
    LazyLock::new(|| FactType::builder(INITIAL_FACT_TYPE_NAME).build());

/// Schema definition for a single fact field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    /// Field key.
    pub key: FieldKey,
    /// Field type.
    pub ty: Type,
    /// Whether the field must be present at declaration.
    pub mandatory: bool,
    /// Value read back when the field is absent.
    pub default: Option<Value>,
}

impl FieldSchema {
    /// Creates an optional field with no default.
    #[must_use]
    pub fn new(key: impl Into<FieldKey>, ty: Type) -> Self {
        Self {
            key: key.into(),
            ty,
            mandatory: false,
            default: None,
        }
    }

    /// Creates a mandatory field.
    #[must_use]
    pub fn mandatory(key: impl Into<FieldKey>, ty: Type) -> Self {
        Self {
            mandatory: true,
            ..Self::new(key, ty)
        }
    }

    /// Creates an optional field with a default value.
    #[must_use]
    pub fn with_default(key: impl Into<FieldKey>, ty: Type, default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::new(key, ty)
        }
    }
}

struct FactTypeInner {
    name: Arc<str>,
    parent: Option<FactType>,
    fields: BTreeMap<FieldKey, FieldSchema>,
}

/// Shared descriptor of a fact subtype.
///
/// Cloning is O(1). Two descriptors are equal when their names are equal;
/// [`FactTypeRegistry`] is what keeps names unique within a rule base.
#[derive(Clone)]
pub struct FactType(Arc<FactTypeInner>);

impl FactType {
    /// The root type every fact type derives from.
    #[must_use]
    pub fn fact() -> Self {
        ROOT.clone()
    }

    /// The sentinel type used to anchor clauses without a positive pattern.
    #[must_use]
    pub fn initial_fact() -> Self {
        INITIAL.clone()
    }

    /// Starts building a subtype of [`FactType::fact`].
    #[must_use]
    pub fn builder(name: impl Into<Arc<str>>) -> FactTypeBuilder {
        FactTypeBuilder::new(name)
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the parent type, `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&FactType> {
        self.0.parent.as_ref()
    }

    /// Returns true if `self` is `other` or one of its subtypes.
    #[must_use]
    pub fn is_a(&self, other: &FactType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    /// Returns the schema of a field, including inherited fields.
    #[must_use]
    pub fn field(&self, key: &FieldKey) -> Option<&FieldSchema> {
        self.0.fields.get(key)
    }

    /// Iterates over the effective schema in key order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.0.fields.values()
    }
}

impl PartialEq for FactType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for FactType {}

impl Hash for FactType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl PartialOrd for FactType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FactType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.name.cmp(&other.0.name)
    }
}

impl fmt::Debug for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactType({})", self.0.name)
    }
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for [`FactType`].
pub struct FactTypeBuilder {
    name: Arc<str>,
    parent: Option<FactType>,
    fields: Vec<FieldSchema>,
}

impl FactTypeBuilder {
    /// Creates a builder for a direct subtype of the root type.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Sets the parent type.
    #[must_use]
    pub fn extends(mut self, parent: &FactType) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Builds the descriptor, computing the effective schema.
    ///
    /// Own fields extend the parent's; a redeclared key replaces the
    /// inherited definition.
    #[must_use]
    pub fn build(self) -> FactType {
        let parent = self.parent.unwrap_or_else(FactType::fact);
        let mut fields = parent.0.fields.clone();
        for field in self.fields {
            fields.insert(field.key.clone(), field);
        }
        FactType(Arc::new(FactTypeInner {
            name: self.name,
            parent: Some(parent),
            fields,
        }))
    }

    fn build_root(self) -> FactType {
        FactType(Arc::new(FactTypeInner {
            name: self.name,
            parent: None,
            fields: BTreeMap::new(),
        }))
    }
}

/// Registry keeping fact type names unique within a rule base.
#[derive(Clone, Debug)]
pub struct FactTypeRegistry {
    types: BTreeMap<Arc<str>, FactType>,
}

impl Default for FactTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FactTypeRegistry {
    /// Creates a registry pre-populated with the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        for ty in [FactType::fact(), FactType::initial_fact()] {
            types.insert(ty.0.name.clone(), ty);
        }
        Self { types }
    }

    /// Builds and registers a type.
    ///
    /// # Errors
    /// Returns `DuplicateFactType` if the name is already taken.
    pub fn register(&mut self, builder: FactTypeBuilder) -> Result<FactType> {
        match self.types.entry(builder.name.clone()) {
            Entry::Occupied(_) => Err(Error::new(ErrorKind::DuplicateFactType(
                builder.name.to_string(),
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(builder.build()).clone()),
        }
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FactType> {
        self.types.get(name)
    }

    /// Returns the number of registered types, built-ins included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false; the built-in types are always registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
