//! Templates, render contexts and template sets.
//!
//! A template renders one entity into a file buffer. Templates are plain
//! closures or types implementing [`Template`]; a [`TemplateSet`] bundles them
//! with the flags, naming function and hooks of one target language.

use crate::config::{Config, Flag, common_flags};
use crate::error::{PostError, RenderError};
use crate::resolver::{NameScope, TypeResolver};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use xogen_schema::{Datatype, Enum, ForeignKey, Index, Proc, Query, Schema, Table, Xo};

/// Header template name.
pub const HDR: &str = "hdr";
/// Package template name.
pub const DB: &str = "db";
/// Table and view template name.
pub const TYPEDEF: &str = "typedef";
/// Enum template name.
pub const ENUM: &str = "enum";
/// Index template name.
pub const INDEX: &str = "index";
/// Foreign key template name.
pub const FOREIGN_KEY: &str = "foreignkey";
/// Stored procedure template name.
pub const PROC: &str = "proc";
/// Query template name.
pub const QUERY: &str = "query";

/// A template rendering one entity.
pub trait Template: Send + Sync {
    /// Appends the rendered entity to `out`.
    ///
    /// # Errors
    /// Returns `RenderError` if the entity cannot be rendered.
    fn render(&self, ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError>;
}

impl<F> Template for F
where
    F: Fn(&RenderContext<'_>, &mut String) -> Result<(), RenderError> + Send + Sync,
{
    fn render(&self, ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
        self(ctx, out)
    }
}

/// Templates keyed by template name.
pub type TemplateBundle = IndexMap<String, Arc<dyn Template>>;

/// Computes the run's helpers from its configuration and resolver.
pub type FuncsFn = fn(&Config, TypeResolver) -> Helpers;

/// Maps a column datatype to a target type name.
pub type TypeMapFn = fn(&Helpers, &Datatype, Option<&Schema>) -> String;

/// Computes the base file name of a rendered entity.
pub type FileNameFn = Arc<dyn Fn(GenKind, &TemplateRef<'_>, &Config) -> String + Send + Sync>;

/// Post-processes one finished file.
pub type PostFn = Arc<dyn Fn(&str) -> Result<String, PostError> + Send + Sync>;

/// What a run generates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenKind {
    /// Introspected schemas.
    Schema,
    /// Hand-written queries.
    Query,
}

/// Identifies one render for file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRef<'a> {
    /// Template name.
    pub template: &'a str,
    /// Owning type name.
    pub type_name: &'a str,
    /// Entity name.
    pub name: &'a str,
}

/// Default file naming.
///
/// In schema mode entity templates are named by their lower-cased owning
/// type; everything else by its lower-cased name. Owners are the snake_case
/// table names (`auth_permission`), never a joined type name
/// (`authpermission`).
#[must_use]
pub fn default_file_name(kind: GenKind, tpl: &TemplateRef<'_>, _config: &Config) -> String {
    if kind == GenKind::Schema
        && matches!(tpl.template, TYPEDEF | ENUM | INDEX | FOREIGN_KEY | PROC)
    {
        return tpl.type_name.to_lowercase();
    }
    if tpl.name.is_empty() {
        tpl.type_name.to_lowercase()
    } else {
        tpl.name.to_lowercase()
    }
}

/// The entity being rendered.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    /// File header.
    Header {
        /// Base name of the file.
        file: &'a str,
    },
    /// Package-level output.
    Package,
    /// Enum type.
    Enum(&'a Enum),
    /// Stored procedure.
    Proc(&'a Proc),
    /// Table or view.
    Table(&'a Table),
    /// Index of a table.
    Index {
        /// Owning table.
        table: &'a Table,
        /// The index.
        index: &'a Index,
    },
    /// Foreign key of a table.
    ForeignKey {
        /// Owning table.
        table: &'a Table,
        /// The key.
        key: &'a ForeignKey,
    },
    /// Hand-written query.
    Query(&'a Query),
}

impl fmt::Display for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header { file } => write!(f, "header of '{}'", file),
            Self::Package => f.write_str("package"),
            Self::Enum(e) => write!(f, "enum '{}'", e.name),
            Self::Proc(p) => write!(f, "proc '{}'", p.name),
            Self::Table(t) => write!(f, "{} '{}'", t.kind, t.name),
            Self::Index { table, index } => {
                write!(f, "index '{}' on '{}'", index.name, table.name)
            }
            Self::ForeignKey { table, key } => {
                write!(f, "foreign key '{}' on '{}'", key.name, table.name)
            }
            Self::Query(q) => write!(f, "query '{}'", q.name),
        }
    }
}

/// Helper functions available to templates.
#[derive(Debug, Clone)]
pub struct Helpers {
    config: Config,
    resolver: TypeResolver,
    map_type: TypeMapFn,
}

impl Helpers {
    /// Creates helpers that map datatypes to their raw type names.
    #[must_use]
    pub fn new(config: &Config, mut resolver: TypeResolver) -> Self {
        resolver.set_conflict_suffix(&config.conflict_suffix);
        Self {
            config: config.clone(),
            resolver,
            map_type: raw_type,
        }
    }

    /// Replaces the datatype mapping.
    #[must_use]
    pub fn with_type_mapper(mut self, map_type: TypeMapFn) -> Self {
        self.map_type = map_type;
        self
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the type resolver.
    #[must_use]
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Registers a type as known for the rest of the run.
    pub fn add_type(&mut self, type_name: impl Into<String>) {
        self.resolver.add_type(type_name);
    }

    /// Maps a datatype to a target type name.
    #[must_use]
    pub fn type_of(&self, datatype: &Datatype, schema: Option<&Schema>) -> String {
        (self.map_type)(self, datatype, schema)
    }

    /// Quotes an identifier for `driver`.
    #[must_use]
    pub fn quote(driver: &str, name: &str) -> String {
        match driver {
            "mysql" => format!("`{}`", name.replace('`', "``")),
            "sqlserver" | "mssql" => format!("[{}]", name.replace(']', "]]")),
            _ => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }
}

fn raw_type(_: &Helpers, datatype: &Datatype, _: Option<&Schema>) -> String {
    datatype.type_name.clone()
}

/// Everything a template sees while rendering one entity.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    entity: Entity<'a>,
    xo: &'a Xo,
    schema: Option<&'a Schema>,
    helpers: &'a Helpers,
    file: &'a str,
    first: bool,
}

impl<'a> RenderContext<'a> {
    /// Creates a context for `entity`.
    #[must_use]
    pub fn new(entity: Entity<'a>, xo: &'a Xo, helpers: &'a Helpers) -> Self {
        Self {
            entity,
            xo,
            schema: None,
            helpers,
            file: "",
            first: false,
        }
    }

    /// Sets the schema owning the entity.
    #[must_use]
    pub fn in_schema(mut self, schema: &'a Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Sets the output file base name.
    #[must_use]
    pub fn in_file(mut self, file: &'a str) -> Self {
        self.file = file;
        self
    }

    /// Marks this render as the first header of the run.
    #[must_use]
    pub fn first(mut self, first: bool) -> Self {
        self.first = first;
        self
    }

    /// Returns the entity.
    #[must_use]
    pub fn entity(&self) -> Entity<'a> {
        self.entity
    }

    /// Returns the run aggregate.
    #[must_use]
    pub fn xo(&self) -> &'a Xo {
        self.xo
    }

    /// Returns the schema owning the entity.
    #[must_use]
    pub fn schema(&self) -> Option<&'a Schema> {
        self.schema
    }

    /// Returns the helpers.
    #[must_use]
    pub fn helpers(&self) -> &'a Helpers {
        self.helpers
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &'a Config {
        self.helpers.config()
    }

    /// Returns the output file base name.
    #[must_use]
    pub fn file(&self) -> &'a str {
        self.file
    }

    /// Returns true until the first header of the run has been rendered.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.first
    }

    /// Returns the driver of the entity.
    #[must_use]
    pub fn driver(&self) -> &'a str {
        if let Entity::Query(query) = self.entity {
            return &query.driver;
        }
        self.schema
            .or_else(|| self.xo.schemas.first())
            .map(|s| s.driver.as_str())
            .or_else(|| self.xo.queries.first().map(|q| q.driver.as_str()))
            .unwrap_or_default()
    }

    /// Starts a naming scope for this render.
    #[must_use]
    pub fn scope(&self) -> NameScope<'a> {
        self.helpers.resolver().scope()
    }

    /// Maps a datatype to a target type name.
    #[must_use]
    pub fn type_of(&self, datatype: &Datatype) -> String {
        self.helpers.type_of(datatype, self.schema)
    }

    /// Escapes a column name when the escape mode asks for it.
    #[must_use]
    pub fn column(&self, name: &str) -> String {
        self.escape(self.config().escape.column(), name)
    }

    /// Returns the qualified, possibly escaped, name of a table.
    #[must_use]
    pub fn table_ref(&self, table: &str) -> String {
        let escape = self.config().escape;
        let table = self.escape(escape.table(), table);
        match self.schema {
            Some(schema) if !schema.name.is_empty() && self.driver() != "sqlite3" => {
                format!("{}.{}", self.escape(escape.schema(), &schema.name), table)
            }
            _ => table,
        }
    }

    fn escape(&self, enabled: bool, name: &str) -> String {
        if enabled {
            Helpers::quote(self.driver(), name)
        } else {
            name.to_string()
        }
    }
}

/// A registered target: templates, flags and hooks.
#[derive(Clone)]
pub struct TemplateSet {
    /// Templates keyed by name.
    pub files: TemplateBundle,
    /// Output file extension.
    pub file_ext: String,
    /// Computes the run's helpers.
    pub funcs: FuncsFn,
    /// Header template rendered at the top of each file.
    pub header: Option<String>,
    /// Templates rendered once per run.
    pub package_templates: Vec<String>,
    /// Computes output file names.
    pub file_name: FileNameFn,
    /// Declared configuration flags.
    pub flags: Vec<Flag>,
    /// Post-processing hook.
    pub post: Option<PostFn>,
    /// Known types and abbreviations.
    pub resolver: TypeResolver,
}

impl TemplateSet {
    /// Creates an empty set writing files with `file_ext`.
    ///
    /// The set starts with the common flags, default file naming and the
    /// default known types.
    #[must_use]
    pub fn new(file_ext: impl Into<String>) -> Self {
        Self {
            files: IndexMap::new(),
            file_ext: file_ext.into(),
            funcs: Helpers::new,
            header: None,
            package_templates: Vec::new(),
            file_name: Arc::new(default_file_name),
            flags: common_flags(),
            post: None,
            resolver: TypeResolver::default(),
        }
    }

    /// Adds a template.
    #[must_use]
    pub fn template(mut self, name: impl Into<String>, template: impl Template + 'static) -> Self {
        self.files.insert(name.into(), Arc::new(template));
        self
    }

    /// Sets the helper computation.
    #[must_use]
    pub fn funcs(mut self, funcs: FuncsFn) -> Self {
        self.funcs = funcs;
        self
    }

    /// Sets the header template.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.header = Some(name.into());
        self
    }

    /// Adds a package-level template.
    #[must_use]
    pub fn package_template(mut self, name: impl Into<String>) -> Self {
        self.package_templates.push(name.into());
        self
    }

    /// Sets the file naming function.
    #[must_use]
    pub fn file_name<F>(mut self, file_name: F) -> Self
    where
        F: Fn(GenKind, &TemplateRef<'_>, &Config) -> String + Send + Sync + 'static,
    {
        self.file_name = Arc::new(file_name);
        self
    }

    /// Replaces the default value of a declared flag, or declares it.
    #[must_use]
    pub fn flag(mut self, flag: Flag) -> Self {
        match self.flags.iter_mut().find(|f| f.key == flag.key) {
            Some(existing) => *existing = flag,
            None => self.flags.push(flag),
        }
        self
    }

    /// Sets the post-processing hook.
    #[must_use]
    pub fn post<F>(mut self, post: F) -> Self
    where
        F: Fn(&str) -> Result<String, PostError> + Send + Sync + 'static,
    {
        self.post = Some(Arc::new(post));
        self
    }

    /// Replaces the type resolver.
    #[must_use]
    pub fn types(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Registers a known type.
    pub fn add_type(&mut self, type_name: impl Into<String>) {
        self.resolver.add_type(type_name);
    }

    /// Returns a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Template>> {
        self.files.get(name)
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("file_ext", &self.file_ext)
            .field("header", &self.header)
            .field("package_templates", &self.package_templates)
            .field("flags", &self.flags)
            .field("post", &self.post.is_some())
            .finish_non_exhaustive()
    }
}
