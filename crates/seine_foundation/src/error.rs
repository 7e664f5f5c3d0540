//! Error types for the Seine system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Every [`ErrorKind`] belongs to one [`ErrorCategory`], so callers can tell
//! a bad rule from a bad fact from a failing rule action.

use std::fmt;

use thiserror::Error;

use crate::fact::FactId;
use crate::types::Type;

/// Result type alias for Seine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Seine operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Creates a negated-variable-without-binding error.
    #[must_use]
    pub fn unbound_negated_variable(rule: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundNegatedVariable {
            rule: rule.into(),
            variable: variable.into(),
        })
    }

    /// Creates an illegal condition error.
    #[must_use]
    pub fn illegal_condition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalCondition(message.into()))
    }

    /// Creates an unresolved constraint error.
    #[must_use]
    pub fn unresolved_constraint(field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnresolvedConstraint {
            field: field.into(),
        })
    }

    /// Creates a nested accessor key error.
    #[must_use]
    pub fn nested_accessor_key(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::NestedAccessorKey { key: key.into() })
    }

    /// Creates a fact not found error.
    #[must_use]
    pub fn fact_not_found(id: FactId) -> Self {
        Self::new(ErrorKind::FactNotFound(id))
    }

    /// Creates a frozen fact error.
    #[must_use]
    pub fn frozen_fact(id: FactId) -> Self {
        Self::new(ErrorKind::FrozenFact(id))
    }

    /// Creates a rule action error.
    #[must_use]
    pub fn action(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Action {
            rule: rule.into(),
            message: message.into(),
        })
    }
}

/// Coarse grouping of error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad rule, schema, or engine construction. Not retryable.
    Configuration,
    /// Bad fact passed to `declare`; working memory is left unchanged.
    Declaration,
    /// Retraction or modification of a fact that is not in working memory.
    Retraction,
    /// A fired rule action failed.
    Action,
    /// Internal invariant violation.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Declaration => write!(f, "declaration"),
            Self::Retraction => write!(f, "retraction"),
            Self::Action => write!(f, "action"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Categorized error kinds.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A negated variable test has no earlier binding to compare against.
    #[error("rule {rule}: negated variable `{variable}` has no prior binding in its clause")]
    UnboundNegatedVariable {
        /// The rule being registered.
        rule: String,
        /// The variable name.
        variable: String,
    },

    /// A condition element cannot be compiled into the network.
    #[error("illegal condition element: {0}")]
    IllegalCondition(String),

    /// A fact type name was registered twice.
    #[error("fact type already registered: {0}")]
    DuplicateFactType(String),

    /// A rule name was registered twice on the same engine.
    #[error("rule already registered: {0}")]
    DuplicateRule(String),

    /// A fact field holds a constraint instead of a concrete value.
    #[error("declared facts cannot contain constraints (field {field})")]
    UnresolvedConstraint {
        /// The offending field key.
        field: String,
    },

    /// A field key contains the reserved nested accessor marker.
    #[error("cannot declare facts containing double underscores as keys: {key}")]
    NestedAccessorKey {
        /// The offending field key.
        key: String,
    },

    /// A mandatory schema field is absent.
    #[error("mandatory field {field} is not defined for fact {fact_type}")]
    MissingField {
        /// The fact type.
        fact_type: String,
        /// The missing field key.
        field: String,
    },

    /// A field value does not inhabit its schema type.
    #[error("invalid value on field {field} for fact {fact_type}: expected {expected}, got {actual}")]
    InvalidField {
        /// The fact type.
        fact_type: String,
        /// The field key.
        field: String,
        /// The schema type.
        expected: Type,
        /// The type of the supplied value.
        actual: Type,
    },

    /// Attempted to mutate a fact after it was committed.
    #[error("a fact can't be modified after declaration: {0}")]
    FrozenFact(FactId),

    /// The fact is not in working memory.
    #[error("fact not found: {0}")]
    FactNotFound(FactId),

    /// A rule action failed.
    #[error("action of rule {rule} failed: {message}")]
    Action {
        /// The rule whose action failed.
        rule: String,
        /// Description of the failure.
        message: String,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns the category this kind belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnboundNegatedVariable { .. }
            | Self::IllegalCondition(_)
            | Self::DuplicateFactType(_)
            | Self::DuplicateRule(_) => ErrorCategory::Configuration,
            Self::UnresolvedConstraint { .. }
            | Self::NestedAccessorKey { .. }
            | Self::MissingField { .. }
            | Self::InvalidField { .. }
            | Self::FrozenFact(_) => ErrorCategory::Declaration,
            Self::FactNotFound(_) => ErrorCategory::Retraction,
            Self::Action { .. } => ErrorCategory::Action,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule being registered or fired, if any.
    pub rule: Option<String>,
    /// Fact involved, if any.
    pub fact: Option<FactId>,
    /// Chain of operations that led to the error, outermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the fact.
    #[must_use]
    pub fn with_fact(mut self, fact: FactId) -> Self {
        self.fact = Some(fact);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
        }
        if let Some(fact) = self.fact {
            write!(f, " at {fact}")?;
        }
        for frame in &self.stack {
            write!(f, "\n  in {frame}")?;
        }
        Ok(())
    }
}
