//! # xogen Codegen
//!
//! Source code generation from xogen schemas and queries.
//!
//! This crate provides:
//! - Template sets and the registry of generation targets
//! - Type and name resolution for generated identifiers
//! - The emitter rendering every entity into output files
//! - Generation runs driving a loader through build and emit
//! - The built-in `rust` target

pub mod config;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod registry;
pub mod resolver;
pub mod rust;
pub mod template;

pub use config::{Config, EscapeMode, Flag, FlagValues};
pub use emitter::{Emitter, OutputFile};
pub use error::{CodegenError, PostError, RenderError};
pub use generator::{GenerationRun, RunState};
pub use registry::Registry;
pub use resolver::{NameScope, TypeResolver};
pub use template::{
    Entity, GenKind, Helpers, RenderContext, Template, TemplateRef, TemplateSet,
};

use xogen_schema::Xo;

/// Generates the files of a built-in target for an already built aggregate.
///
/// # Arguments
/// * `target` - Registry key of the target, e.g. `rust`
/// * `xo` - Schemas and queries to generate from
/// * `values` - Raw flag values
///
/// # Returns
/// The generated files, in first-appearance order.
///
/// # Errors
/// Returns `CodegenError` if the target is unknown, a flag is invalid, a
/// schema does not validate or rendering fails.
pub fn generate(
    target: &str,
    xo: &Xo,
    values: FlagValues,
) -> Result<Vec<OutputFile>, CodegenError> {
    let registry = Registry::with_builtin();
    GenerationRun::new(&registry, target, values).run_xo(xo)
}
