//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! ```ignore
//! use xogen::prelude::*;
//! ```

// Schema types
pub use xogen_schema::{
    Datatype, Enum, Field, FkMode, ForeignKey, Index, Proc, Schema, Table, TableKind,
};

// Loading and building
pub use xogen_schema::{
    Facts, LoadError, Loader, Query, QueryBuilder, QueryError, SchemaBuilder, SchemaError,
    StaticLoader, Xo, load_facts, validate_schema,
};

// Generation
pub use xogen_codegen::{
    CodegenError, Config, Entity, EscapeMode, Flag, FlagValues, GenerationRun, OutputFile,
    PostError, Registry, RenderContext, RenderError, RunState, Template, TemplateSet, generate,
};

// Cancellation of loader calls
pub use tokio_util::sync::CancellationToken;
