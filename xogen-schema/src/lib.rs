//! # xogen Schema
//!
//! Database schema intermediate representation.
//!
//! This crate provides:
//! - The schema IR (tables, views, columns, indexes, foreign keys, enums, procs)
//! - The `Loader` interface implemented per database engine
//! - The IR builder normalizing raw loader facts
//! - Schema validation
//! - Hand-written query parsing and the `Xo` run aggregate

pub mod builder;
pub mod error;
pub mod loader;
pub mod naming;
pub mod query;
pub mod types;
pub mod validation;
pub mod xo;

pub use builder::{FkMode, SchemaBuilder, load_facts};
pub use error::{LoadError, QueryError, SchemaError};
pub use loader::{Facts, Loader, StaticLoader};
pub use query::{Query, QueryBuilder};
pub use types::{Datatype, Enum, Field, ForeignKey, Index, Proc, Schema, Table, TableKind};
pub use validation::validate_schema;
pub use xo::{Emitted, Xo};
