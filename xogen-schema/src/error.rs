//! Error types for schema loading, building and validation.

use thiserror::Error;

/// Boxed driver error carried by [`LoadError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by a [`Loader`](crate::loader::Loader) implementation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LoadError {
    /// Human readable description.
    pub message: String,
    /// Underlying driver error, if any.
    #[source]
    pub source: Option<BoxError>,
}

impl LoadError {
    /// Creates a load error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a load error wrapping a driver error.
    pub fn wrap(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Error type for IR building and validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A loader call failed.
    #[error("load failed during '{operation}': {source}")]
    Load {
        /// Loader operation that failed.
        operation: String,
        /// Driver error.
        #[source]
        source: LoadError,
    },

    /// Loading was cancelled by the caller.
    #[error("schema load cancelled")]
    Cancelled,

    /// A foreign key references a table missing from the schema.
    #[error("foreign key '{key}' on table '{table}' references unknown table '{ref_table}'")]
    DanglingForeignKey {
        /// Owning table.
        table: String,
        /// Constraint name.
        key: String,
        /// Referenced table name.
        ref_table: String,
    },

    /// A column referenced by an index, key or table constraint does not exist.
    #[error("unknown column '{column}' on table '{table}' referenced by {context}")]
    UnknownColumn {
        /// Table that should own the column.
        table: String,
        /// Column name.
        column: String,
        /// What referenced the column.
        context: String,
    },

    /// Two entities share a name in one scope.
    #[error("duplicate {kind} '{name}' in {scope}")]
    DuplicateEntity {
        /// Kind of entity (table, enum, column, ...).
        kind: String,
        /// Scope in which names must be unique.
        scope: String,
        /// The duplicated name.
        name: String,
    },

    /// A structural invariant of the IR does not hold.
    #[error("invalid schema: {message}")]
    Invalid {
        /// Error message.
        message: String,
    },

    /// Fact file could not be decoded.
    #[error("invalid fact file: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Creates a duplicate entity error.
    pub fn duplicate(
        kind: impl Into<String>,
        scope: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DuplicateEntity {
            kind: kind.into(),
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Creates an unknown column error.
    pub fn unknown_column(
        table: impl Into<String>,
        column: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
            context: context.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Error type for hand-written query parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// A `%%` placeholder was opened but never closed.
    #[error("unterminated placeholder in query '{query}' at line {line}")]
    Unterminated {
        /// Query name.
        query: String,
        /// 1-based line number.
        line: usize,
    },

    /// A placeholder is missing its name or type.
    #[error("malformed placeholder '{placeholder}' in query '{query}'")]
    Malformed {
        /// Query name.
        query: String,
        /// Raw placeholder text.
        placeholder: String,
    },

    /// The query has no SQL text.
    #[error("query '{query}' is empty")]
    Empty {
        /// Query name.
        query: String,
    },
}
