//! # xogen
//!
//! Generates typed database access code from database schemas and
//! hand-written queries.
//!
//! A loader introspects one schema into raw facts, the schema builder turns
//! them into a normalized IR, and a registered template set renders every
//! table, view, index, foreign key, enum, stored procedure and query into
//! source files.
//!
//! ## Quick Start
//!
//! ```ignore
//! use xogen::prelude::*;
//!
//! let registry = Registry::with_builtin();
//! let loader = StaticLoader::new(Facts::from_json(&facts_json)?);
//! let mut run = GenerationRun::new(&registry, "rust", FlagValues::new());
//! let files = run
//!     .run(&loader, "public", Vec::new(), &CancellationToken::new())
//!     .await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`schema`] - Schema IR, loader interface, IR builder and queries
//! - [`codegen`] - Template sets, registry, resolver, emitter and targets

pub mod prelude;

/// Schema IR, loader interface and IR builder.
pub mod schema {
    pub use xogen_schema::*;
}

/// Template sets, registry and emitter.
pub mod codegen {
    pub use xogen_codegen::*;
}

// Re-export commonly used items at the crate root
pub use xogen_codegen::{
    CodegenError, Config, FlagValues, GenerationRun, OutputFile, Registry, TemplateSet, generate,
};
pub use xogen_schema::{
    Facts, Loader, Query, QueryBuilder, Schema, SchemaBuilder, SchemaError, StaticLoader, Xo,
};
