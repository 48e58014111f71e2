//! Generation runs.
//!
//! A [`GenerationRun`] drives one target through `Init → Build → Emit → Done`.
//! Any error moves it to `Failed` and is returned to the caller; the run is
//! not retried.

use crate::config::{Config, FlagValues};
use crate::emitter::{Emitter, OutputFile};
use crate::error::CodegenError;
use crate::registry::Registry;
use crate::template::TemplateSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use xogen_schema::{Loader, Query, SchemaBuilder, Xo, load_facts, validate_schema};

/// State of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Init,
    /// Building the schema IR.
    Build,
    /// Rendering templates.
    Emit,
    /// Finished successfully.
    Done,
    /// Aborted with the first error.
    Failed(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Build => f.write_str("build"),
            Self::Emit => f.write_str("emit"),
            Self::Done => f.write_str("done"),
            Self::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// One generation run against a registered target.
#[derive(Debug)]
pub struct GenerationRun<'r> {
    registry: &'r Registry,
    target: String,
    values: FlagValues,
    state: RunState,
}

impl<'r> GenerationRun<'r> {
    /// Creates a run for `target` with raw flag values.
    #[must_use]
    pub fn new(registry: &'r Registry, target: impl Into<String>, values: FlagValues) -> Self {
        Self {
            registry,
            target: target.into(),
            values,
            state: RunState::Init,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Loads `schema` through `loader`, adds `queries` and emits everything.
    ///
    /// # Errors
    /// Returns configuration errors before anything is loaded, then schema,
    /// load and cancellation errors, then rendering errors.
    pub async fn run(
        &mut self,
        loader: &dyn Loader,
        schema: &str,
        queries: Vec<Query>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, CodegenError> {
        let result = self.try_run(loader, schema, queries, cancel).await;
        self.settle(result)
    }

    /// Emits an already built aggregate.
    ///
    /// Schemas are validated during the build step.
    ///
    /// # Errors
    /// Returns configuration, validation or rendering errors.
    pub fn run_xo(&mut self, xo: &Xo) -> Result<Vec<OutputFile>, CodegenError> {
        let result = self.try_run_xo(xo);
        self.settle(result)
    }

    async fn try_run(
        &mut self,
        loader: &dyn Loader,
        schema: &str,
        queries: Vec<Query>,
        cancel: &CancellationToken,
    ) -> Result<Vec<OutputFile>, CodegenError> {
        let (set, config) = self.init()?;

        self.transition(RunState::Build);
        let facts = load_facts(loader, schema, cancel).await?;
        let schema = SchemaBuilder::new().fk_mode(config.fk_mode).build(facts)?;
        let mut xo = Xo::new();
        xo.emit(schema)?;
        for query in queries {
            xo.emit(query)?;
        }

        self.emit(&set, &config, &xo)
    }

    fn try_run_xo(&mut self, xo: &Xo) -> Result<Vec<OutputFile>, CodegenError> {
        let (set, config) = self.init()?;

        self.transition(RunState::Build);
        for schema in &xo.schemas {
            validate_schema(schema)?;
        }

        self.emit(&set, &config, xo)
    }

    fn init(&mut self) -> Result<(Arc<TemplateSet>, Config), CodegenError> {
        if self.state != RunState::Init {
            return Err(CodegenError::AlreadyStarted {
                state: self.state.to_string(),
            });
        }
        let set = self.registry.lookup(&self.target)?;
        let config = Config::resolve(&set.flags, &self.values)?;
        tracing::info!("Generating '{}' ({})", self.target, set.file_ext);
        Ok((set, config))
    }

    fn emit(
        &mut self,
        set: &TemplateSet,
        config: &Config,
        xo: &Xo,
    ) -> Result<Vec<OutputFile>, CodegenError> {
        self.transition(RunState::Emit);
        Emitter::new(set, config).emit(xo)
    }

    fn settle(
        &mut self,
        result: Result<Vec<OutputFile>, CodegenError>,
    ) -> Result<Vec<OutputFile>, CodegenError> {
        match &result {
            Ok(files) => {
                self.transition(RunState::Done);
                tracing::info!("Generated {} files for '{}'", files.len(), self.target);
            }
            Err(CodegenError::AlreadyStarted { .. }) => {}
            Err(err) => {
                tracing::error!("Generation for '{}' failed: {}", self.target, err);
                self.transition(RunState::Failed(err.to_string()));
            }
        }
        result
    }

    fn transition(&mut self, next: RunState) {
        tracing::info!("Run '{}': {} -> {}", self.target, self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ESCAPE;
    use crate::error::RenderError;
    use crate::template::{RenderContext, TYPEDEF};
    use xogen_schema::loader::{Facts, RawColumn, RawTable, StaticLoader, TableFacts};
    use xogen_schema::{Datatype, TableKind};

    fn typedef(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
        out.push_str(&ctx.entity().to_string());
        Ok(())
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register("txt", TemplateSet::new(".txt").template(TYPEDEF, typedef))
            .expect("Failed to register");
        registry
    }

    fn facts() -> Facts {
        let mut facts = Facts::new("postgres", "public");
        facts.tables.push(TableFacts {
            def: RawTable {
                kind: TableKind::Table,
                name: "user".to_string(),
                ..RawTable::default()
            },
            columns: vec![RawColumn {
                ordinal: 1,
                name: "id".to_string(),
                datatype: Datatype::new("integer"),
                ..RawColumn::default()
            }],
            ..TableFacts::default()
        });
        facts
    }

    #[tokio::test]
    async fn test_run_reaches_done() {
        let registry = registry();
        let mut run = GenerationRun::new(&registry, "txt", FlagValues::new());
        assert_eq!(run.state(), &RunState::Init);

        let loader = StaticLoader::new(facts());
        let files = run
            .run(&loader, "public", Vec::new(), &CancellationToken::new())
            .await
            .expect("Failed to run");

        assert_eq!(run.state(), &RunState::Done);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "table 'user'");
    }

    #[tokio::test]
    async fn test_unknown_target_fails_in_init() {
        let registry = registry();
        let mut run = GenerationRun::new(&registry, "cobol", FlagValues::new());
        let loader = StaticLoader::new(facts());
        let err = run
            .run(&loader, "public", Vec::new(), &CancellationToken::new())
            .await
            .expect_err("should fail");
        assert!(matches!(err, CodegenError::UnknownTarget { .. }));
        assert!(matches!(run.state(), RunState::Failed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_run_fails_in_build() {
        let registry = registry();
        let mut run = GenerationRun::new(&registry, "txt", FlagValues::new());
        let loader = StaticLoader::new(facts());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run
            .run(&loader, "public", Vec::new(), &cancel)
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            CodegenError::Schema(xogen_schema::SchemaError::Cancelled)
        ));
        assert!(matches!(run.state(), RunState::Failed(_)));
    }

    #[test]
    fn test_invalid_flag_reported_before_build() {
        let registry = registry();
        let values = FlagValues::new().with(ESCAPE, "sometimes");
        let mut run = GenerationRun::new(&registry, "txt", values);
        let err = run.run_xo(&Xo::new()).expect_err("should fail");
        assert!(matches!(err, CodegenError::InvalidFlag { .. }));
    }

    #[test]
    fn test_run_only_once() {
        let registry = registry();
        let mut run = GenerationRun::new(&registry, "txt", FlagValues::new());
        run.run_xo(&Xo::new()).expect("Failed to run");
        let err = run.run_xo(&Xo::new()).expect_err("should fail");
        assert!(matches!(err, CodegenError::AlreadyStarted { .. }));
        assert_eq!(run.state(), &RunState::Done);
    }
}
