//! Aggregate root of a generation run.

use crate::error::SchemaError;
use crate::query::Query;
use crate::types::Schema;
use serde::{Deserialize, Serialize};

/// A value produced for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    /// A hand-written query.
    Query(Query),
    /// An introspected schema.
    Schema(Schema),
}

impl From<Query> for Emitted {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

impl From<Schema> for Emitted {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

/// Queries and schemas accumulated for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Xo {
    /// Queries, in insertion order.
    pub queries: Vec<Query>,
    /// Schemas, in insertion order.
    pub schemas: Vec<Schema>,
}

impl Xo {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query or schema.
    ///
    /// # Errors
    /// Returns `SchemaError::DuplicateEntity` when a query or schema with the
    /// same name was already emitted.
    pub fn emit(&mut self, value: impl Into<Emitted>) -> Result<(), SchemaError> {
        match value.into() {
            Emitted::Query(query) => {
                if self.queries.iter().any(|q| q.name == query.name) {
                    return Err(SchemaError::duplicate("query", "run", &query.name));
                }
                self.queries.push(query);
            }
            Emitted::Schema(schema) => {
                if self.schemas.iter().any(|s| s.name == schema.name) {
                    return Err(SchemaError::duplicate("schema", "run", &schema.name));
                }
                self.schemas.push(schema);
            }
        }
        Ok(())
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.schemas.is_empty()
    }
}
