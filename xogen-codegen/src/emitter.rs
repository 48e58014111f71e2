//! Rendering of a run's entities into output files.

use crate::config::Config;
use crate::error::CodegenError;
use crate::template::{
    DB, ENUM, Entity, FOREIGN_KEY, GenKind, Helpers, INDEX, PROC, QUERY, RenderContext, TYPEDEF,
    Template, TemplateRef, TemplateSet,
};
use indexmap::IndexMap;
use std::sync::Arc;
use xogen_schema::naming::to_pascal_case;
use xogen_schema::{Schema, Table, Xo};

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Base name, without extension.
    pub name: String,
    /// Extension, including the leading dot.
    pub ext: String,
    /// File content.
    pub content: String,
}

impl OutputFile {
    /// Returns the file name with its extension.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}{}", self.name, self.ext)
    }
}

/// Renders entities through a template set.
///
/// Templates for optional entity kinds (enums, procs, indexes, foreign keys)
/// are skipped when the set does not provide them. The `typedef` template is
/// required for schemas and `query` for queries, as are the declared header
/// and package templates.
pub struct Emitter<'a> {
    set: &'a TemplateSet,
    helpers: Helpers,
    files: IndexMap<String, String>,
    first: bool,
}

impl<'a> Emitter<'a> {
    /// Creates an emitter for one run.
    #[must_use]
    pub fn new(set: &'a TemplateSet, config: &Config) -> Self {
        Self {
            set,
            helpers: (set.funcs)(config, set.resolver.clone()),
            files: IndexMap::new(),
            first: true,
        }
    }

    /// Renders every entity of `xo` and post-processes each file once.
    ///
    /// # Errors
    /// Returns `CodegenError::TemplateNotFound` when a required template is
    /// missing, `CodegenError::RenderFailed` when a template fails and
    /// `CodegenError::PostProcessFailed` when the post hook rejects a file.
    /// No output is returned on error.
    pub fn emit(mut self, xo: &Xo) -> Result<Vec<OutputFile>, CodegenError> {
        for schema in &xo.schemas {
            for enum_def in &schema.enums {
                self.helpers.add_type(to_pascal_case(&enum_def.name));
            }
        }

        if !self.helpers.config().not_first {
            let kind = if xo.schemas.is_empty() {
                GenKind::Query
            } else {
                GenKind::Schema
            };
            let set = self.set;
            for name in &set.package_templates {
                let tpl = TemplateRef {
                    template: name,
                    type_name: DB,
                    name,
                };
                self.render(xo, xo.schemas.first(), kind, tpl, Entity::Package, true)?;
            }
        }

        for schema in &xo.schemas {
            self.emit_schema(xo, schema)?;
        }

        for query in &xo.queries {
            let tpl = TemplateRef {
                template: QUERY,
                type_name: &query.type_name,
                name: &query.name,
            };
            self.render(xo, None, GenKind::Query, tpl, Entity::Query(query), true)?;
        }

        self.finish()
    }

    fn emit_schema(&mut self, xo: &Xo, schema: &Schema) -> Result<(), CodegenError> {
        for enum_def in &schema.enums {
            let tpl = TemplateRef {
                template: ENUM,
                type_name: &enum_def.name,
                name: &enum_def.name,
            };
            self.render(xo, Some(schema), GenKind::Schema, tpl, Entity::Enum(enum_def), false)?;
        }

        for proc_def in &schema.procs {
            let tpl = TemplateRef {
                template: PROC,
                type_name: &proc_def.name,
                name: &proc_def.name,
            };
            self.render(xo, Some(schema), GenKind::Schema, tpl, Entity::Proc(proc_def), false)?;
        }

        for table in schema.tables.iter().chain(&schema.views) {
            self.emit_table(xo, schema, table)?;
        }
        Ok(())
    }

    fn emit_table(&mut self, xo: &Xo, schema: &Schema, table: &Table) -> Result<(), CodegenError> {
        let tpl = TemplateRef {
            template: TYPEDEF,
            type_name: &table.name,
            name: &table.name,
        };
        self.render(xo, Some(schema), GenKind::Schema, tpl, Entity::Table(table), true)?;

        for index in &table.indexes {
            let tpl = TemplateRef {
                template: INDEX,
                type_name: &table.name,
                name: &index.name,
            };
            let entity = Entity::Index { table, index };
            self.render(xo, Some(schema), GenKind::Schema, tpl, entity, false)?;
        }

        for key in &table.foreign_keys {
            let tpl = TemplateRef {
                template: FOREIGN_KEY,
                type_name: &table.name,
                name: &key.name,
            };
            let entity = Entity::ForeignKey { table, key };
            self.render(xo, Some(schema), GenKind::Schema, tpl, entity, false)?;
        }
        Ok(())
    }

    fn template(&self, name: &str, entity: &Entity<'_>) -> Result<Arc<dyn Template>, CodegenError> {
        self.set
            .get(name)
            .cloned()
            .ok_or_else(|| CodegenError::TemplateNotFound {
                template: name.to_string(),
                entity: entity.to_string(),
            })
    }

    fn render(
        &mut self,
        xo: &Xo,
        schema: Option<&Schema>,
        kind: GenKind,
        tpl: TemplateRef<'_>,
        entity: Entity<'_>,
        required: bool,
    ) -> Result<(), CodegenError> {
        let template = match self.template(tpl.template, &entity) {
            Ok(template) => template,
            Err(_) if !required => {
                tracing::debug!("No '{}' template, skipping {}", tpl.template, entity);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let file = (self.set.file_name)(kind, &tpl, self.helpers.config());
        if !self.files.contains_key(&file) {
            let header = self.header(xo, schema, &file)?;
            self.files.insert(file.clone(), header);
        }

        tracing::debug!("Rendering {} with '{}' into '{}'", entity, tpl.template, file);
        let mut ctx = RenderContext::new(entity, xo, &self.helpers)
            .in_file(&file)
            .first(self.first);
        if let Some(schema) = schema {
            ctx = ctx.in_schema(schema);
        }
        let Some(buf) = self.files.get_mut(&file) else {
            return Ok(());
        };
        template
            .render(&ctx, buf)
            .map_err(|source| CodegenError::RenderFailed {
                template: tpl.template.to_string(),
                entity: entity.to_string(),
                source,
            })
    }

    fn header(&mut self, xo: &Xo, schema: Option<&Schema>, file: &str) -> Result<String, CodegenError> {
        let mut buf = String::new();
        let Some(name) = self.set.header.as_deref() else {
            return Ok(buf);
        };

        let entity = Entity::Header { file };
        let template = self.template(name, &entity)?;
        let mut ctx = RenderContext::new(entity, xo, &self.helpers)
            .in_file(file)
            .first(self.first);
        if let Some(schema) = schema {
            ctx = ctx.in_schema(schema);
        }
        template
            .render(&ctx, &mut buf)
            .map_err(|source| CodegenError::RenderFailed {
                template: name.to_string(),
                entity: entity.to_string(),
                source,
            })?;
        self.first = false;
        Ok(buf)
    }

    fn finish(self) -> Result<Vec<OutputFile>, CodegenError> {
        let ext = &self.set.file_ext;
        let mut out = Vec::with_capacity(self.files.len());
        for (name, content) in self.files {
            let content = match &self.set.post {
                Some(post) => post(&content).map_err(|source| CodegenError::PostProcessFailed {
                    file: format!("{}{}", name, ext),
                    source,
                })?,
                None => content,
            };
            out.push(OutputFile {
                name,
                ext: ext.clone(),
                content,
            });
        }
        tracing::debug!("Emitted {} files", out.len());
        Ok(out)
    }
}
