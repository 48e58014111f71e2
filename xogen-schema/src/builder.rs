//! Schema IR builder.
//!
//! Collects raw facts from a [`Loader`] and normalizes them into a [`Schema`]:
//! orders columns, index members, enum values and parameters; attaches
//! indexes and foreign keys to their tables; derives primary keys, index
//! function names and foreign key names; and resolves every foreign key
//! against the schema's tables.

use crate::error::{LoadError, SchemaError};
use crate::loader::{
    EnumFacts, Facts, IndexFacts, Loader, ProcFacts, RawForeignKey, TableFacts,
};
use crate::naming::{index_func_name, strip_id_suffix, to_snake_case};
use crate::types::{Datatype, Enum, Field, ForeignKey, Index, Proc, Schema, Table, TableKind};
use crate::validation::validate_schema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Naming mode for resolved foreign key names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FkMode {
    /// Field name when the column ends in `_id`, referenced table otherwise.
    #[default]
    Smart,
    /// Referenced table name.
    Parent,
    /// Column name without its `_id` suffix.
    Field,
    /// Constraint name.
    Key,
}

impl FkMode {
    /// All legal mode names.
    pub const VALUES: [&'static str; 4] = ["smart", "parent", "field", "key"];

    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Parent => "parent",
            Self::Field => "field",
            Self::Key => "key",
        }
    }
}

impl fmt::Display for FkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FkMode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smart" | "" => Ok(Self::Smart),
            "parent" => Ok(Self::Parent),
            "field" => Ok(Self::Field),
            "key" => Ok(Self::Key),
            other => Err(SchemaError::invalid(format!(
                "unknown foreign key mode '{other}'"
            ))),
        }
    }
}

/// Builds [`Schema`] values from loader facts.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    fk_mode: FkMode,
}

impl SchemaBuilder {
    /// Creates a builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the foreign key naming mode.
    #[must_use]
    pub fn fk_mode(mut self, mode: FkMode) -> Self {
        self.fk_mode = mode;
        self
    }

    /// Loads facts for `schema` from `loader` and builds the IR.
    ///
    /// # Errors
    /// Returns `SchemaError::Load` when a loader call fails,
    /// `SchemaError::Cancelled` when `cancel` fires, and any build error.
    pub async fn load(
        &self,
        loader: &dyn Loader,
        schema: &str,
        cancel: &CancellationToken,
    ) -> Result<Schema, SchemaError> {
        let facts = load_facts(loader, schema, cancel).await?;
        self.build(facts)
    }

    /// Builds the IR from a fact snapshot.
    ///
    /// # Errors
    /// Returns `SchemaError::DanglingForeignKey` for a key referencing a
    /// missing table, `SchemaError::UnknownColumn` for an index or key over a
    /// missing column, and `SchemaError::DuplicateEntity` for name clashes.
    pub fn build(&self, facts: Facts) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new(facts.driver, facts.schema);

        let mut seen = HashSet::new();
        for enum_facts in facts.enums {
            if !seen.insert(enum_facts.def.name.clone()) {
                return Err(SchemaError::duplicate("enum", &schema.name, &enum_facts.def.name));
            }
            schema.enums.push(build_enum(enum_facts)?);
        }
        schema.enums.sort_by(|a, b| a.name.cmp(&b.name));

        seen.clear();
        for proc_facts in facts.procs {
            if !seen.insert(proc_facts.def.name.clone()) {
                return Err(SchemaError::duplicate("proc", &schema.name, &proc_facts.def.name));
            }
            schema.procs.push(build_proc(proc_facts));
        }
        schema.procs.sort_by(|a, b| a.name.cmp(&b.name));

        seen.clear();
        let mut pending_keys: Vec<(String, Vec<RawForeignKey>)> = Vec::new();
        for table_facts in facts.tables {
            if !seen.insert(table_facts.def.name.clone()) {
                return Err(SchemaError::duplicate("table", &schema.name, &table_facts.def.name));
            }
            let (table, keys) = build_table(table_facts)?;
            if !keys.is_empty() {
                pending_keys.push((table.name.clone(), keys));
            }
            match table.kind {
                TableKind::Table => schema.tables.push(table),
                TableKind::View => schema.views.push(table),
            }
        }
        schema.tables.sort_by(|a, b| a.name.cmp(&b.name));
        schema.views.sort_by(|a, b| a.name.cmp(&b.name));

        // Keys resolve only once every table exists.
        for (table_name, keys) in pending_keys {
            let resolved = self.resolve_foreign_keys(&schema, &table_name, keys)?;
            if let Some(table) = schema
                .tables
                .iter_mut()
                .chain(schema.views.iter_mut())
                .find(|t| t.name == table_name)
            {
                table.foreign_keys = resolved;
            }
        }

        validate_schema(&schema)?;

        tracing::info!(
            "built schema '{}' ({}): {} tables, {} views, {} enums, {} procs",
            schema.name,
            schema.driver,
            schema.tables.len(),
            schema.views.len(),
            schema.enums.len(),
            schema.procs.len()
        );

        Ok(schema)
    }

    fn resolve_foreign_keys(
        &self,
        schema: &Schema,
        table_name: &str,
        mut keys: Vec<RawForeignKey>,
    ) -> Result<Vec<ForeignKey>, SchemaError> {
        keys.sort_by(|a, b| a.key_id.cmp(&b.key_id).then_with(|| a.name.cmp(&b.name)));

        let table = schema
            .table(table_name)
            .ok_or_else(|| SchemaError::invalid(format!("table '{table_name}' vanished")))?;

        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            let field = table.column(&key.column).cloned().ok_or_else(|| {
                SchemaError::unknown_column(
                    table_name,
                    &key.column,
                    format!("foreign key '{}'", key.name),
                )
            })?;

            let ref_table =
                schema
                    .table(&key.ref_table)
                    .ok_or_else(|| SchemaError::DanglingForeignKey {
                        table: table_name.to_string(),
                        key: key.name.clone(),
                        ref_table: key.ref_table.clone(),
                    })?;

            let ref_field = ref_table.column(&key.ref_column).cloned().ok_or_else(|| {
                SchemaError::unknown_column(
                    &ref_table.name,
                    &key.ref_column,
                    format!("foreign key '{}' on '{}'", key.name, table_name),
                )
            })?;

            let ref_index = ref_table.indexes.iter().find(|idx| {
                idx.is_unique && idx.fields.len() == 1 && idx.fields[0].name == ref_field.name
            });
            let (ref_index, ref_func_name) = match ref_index {
                Some(idx) => (idx.name.clone(), idx.func_name.clone()),
                None => {
                    tracing::debug!(
                        "no unique index on {}.{} for foreign key '{}', deriving lookup name",
                        ref_table.name,
                        ref_field.name,
                        key.name
                    );
                    (
                        String::new(),
                        index_func_name(&ref_table.name, [ref_field.name.as_str()]),
                    )
                }
            };

            resolved.push(ForeignKey {
                resolved_name: self.resolved_name(&key, &field),
                name: key.name,
                field,
                ref_index,
                ref_table: ref_table.name.clone(),
                ref_field,
                ref_func_name,
            });
        }

        // Colliding names fall back to the constraint name.
        let mut counts: HashMap<String, usize> = HashMap::new();
        for fk in &resolved {
            *counts.entry(fk.resolved_name.clone()).or_default() += 1;
        }
        for fk in &mut resolved {
            if counts.get(&fk.resolved_name).copied().unwrap_or(0) > 1 {
                tracing::warn!(
                    "foreign key name '{}' is ambiguous on '{}', using constraint name '{}'",
                    fk.resolved_name,
                    table_name,
                    fk.name
                );
                fk.resolved_name = to_snake_case(&fk.name);
            }
        }

        Ok(resolved)
    }

    fn resolved_name(&self, key: &RawForeignKey, field: &Field) -> String {
        let by_field = || to_snake_case(strip_id_suffix(&field.name));
        let by_parent = || to_snake_case(&key.ref_table);
        match self.fk_mode {
            FkMode::Parent => by_parent(),
            FkMode::Field => by_field(),
            FkMode::Key => to_snake_case(&key.name),
            FkMode::Smart => {
                if field.name.to_ascii_lowercase().ends_with("_id") {
                    by_field()
                } else {
                    by_parent()
                }
            }
        }
    }
}

/// Collects every fact about `schema` from `loader`.
///
/// Each loader call races `cancel`.
///
/// # Errors
/// Returns `SchemaError::Load` for a failed call or `SchemaError::Cancelled`.
pub async fn load_facts(
    loader: &dyn Loader,
    schema: &str,
    cancel: &CancellationToken,
) -> Result<Facts, SchemaError> {
    let mut facts = Facts::new(loader.driver(), schema);

    for def in guarded(cancel, "enums", loader.enums(schema)).await? {
        let values = guarded(cancel, "enum values", loader.enum_values(schema, &def.name)).await?;
        facts.enums.push(EnumFacts { def, values });
    }

    for def in guarded(cancel, "procs", loader.procs(schema)).await? {
        let params = guarded(cancel, "proc params", loader.proc_params(schema, &def.name)).await?;
        facts.procs.push(ProcFacts { def, params });
    }

    for kind in [TableKind::Table, TableKind::View] {
        for def in guarded(cancel, "tables", loader.tables(schema, kind)).await? {
            let columns =
                guarded(cancel, "columns", loader.table_columns(schema, &def.name)).await?;
            let mut indexes = Vec::new();
            let mut foreign_keys = Vec::new();
            if kind == TableKind::Table {
                for index in guarded(cancel, "indexes", loader.indexes(schema, &def.name)).await? {
                    let columns = guarded(
                        cancel,
                        "index columns",
                        loader.index_columns(schema, &def.name, &index.name),
                    )
                    .await?;
                    indexes.push(IndexFacts {
                        def: index,
                        columns,
                    });
                }
                foreign_keys =
                    guarded(cancel, "foreign keys", loader.foreign_keys(schema, &def.name)).await?;
            }
            tracing::debug!("loaded {} '{}' ({} columns)", kind, def.name, columns.len());
            facts.tables.push(TableFacts {
                def,
                columns,
                indexes,
                foreign_keys,
            });
        }
    }

    Ok(facts)
}

async fn guarded<T>(
    cancel: &CancellationToken,
    operation: &str,
    call: impl Future<Output = Result<T, LoadError>>,
) -> Result<T, SchemaError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SchemaError::Cancelled),
        result = call => result.map_err(|source| SchemaError::Load {
            operation: operation.to_string(),
            source,
        }),
    }
}

fn build_enum(facts: EnumFacts) -> Result<Enum, SchemaError> {
    let mut raw = facts.values;
    raw.sort_by_key(|v| v.const_value);

    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(raw.len());
    for value in raw {
        if !seen.insert(value.name.clone()) {
            return Err(SchemaError::duplicate("enum value", &facts.def.name, &value.name));
        }
        values.push(Field {
            name: value.name,
            datatype: Datatype::new(&facts.def.name),
            const_value: Some(value.const_value),
            ..Field::default()
        });
    }

    Ok(Enum {
        name: facts.def.name,
        values,
        comment: facts.def.comment,
    })
}

fn build_proc(facts: ProcFacts) -> Proc {
    let mut raw = facts.params;
    raw.sort_by_key(|p| p.ordinal);

    Proc {
        name: facts.def.name,
        params: raw
            .into_iter()
            .map(|p| Field::new(p.name, p.datatype))
            .collect(),
        return_field: Field::new("r0", facts.def.returns),
        comment: facts.def.comment,
    }
}

fn build_table(facts: TableFacts) -> Result<(Table, Vec<RawForeignKey>), SchemaError> {
    let TableFacts {
        def,
        mut columns,
        indexes,
        foreign_keys,
    } = facts;

    let mut table = Table::new(def.kind, def.name);
    table.manual = def.manual;
    table.comment = def.comment;

    columns.sort_by_key(|c| c.ordinal);
    let mut seen = HashSet::new();
    for col in columns {
        if !seen.insert(col.name.clone()) {
            return Err(SchemaError::duplicate("column", &table.name, &col.name));
        }
        table.columns.push(Field {
            name: col.name,
            datatype: col.datatype,
            default: col.default,
            comment: col.comment,
            is_primary: col.is_primary,
            is_sequence: col.is_sequence,
            ..Field::default()
        });
    }
    table.primary_keys = table
        .columns
        .iter()
        .filter(|c| c.is_primary)
        .cloned()
        .collect();

    table.indexes = build_indexes(&table, indexes)?;

    Ok((table, foreign_keys))
}

fn build_indexes(table: &Table, mut raw: Vec<IndexFacts>) -> Result<Vec<Index>, SchemaError> {
    raw.sort_by(|a, b| {
        b.def
            .is_primary
            .cmp(&a.def.is_primary)
            .then_with(|| a.def.name.cmp(&b.def.name))
    });

    let mut indexes = Vec::with_capacity(raw.len() + 1);
    let mut seen = HashSet::new();
    for mut facts in raw {
        if !seen.insert(facts.def.name.clone()) {
            return Err(SchemaError::duplicate("index", &table.name, &facts.def.name));
        }
        facts.columns.sort_by_key(|c| c.seq_no);
        let fields = facts
            .columns
            .iter()
            .map(|c| {
                table.column(&c.column).cloned().ok_or_else(|| {
                    SchemaError::unknown_column(
                        &table.name,
                        &c.column,
                        format!("index '{}'", facts.def.name),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        indexes.push(Index {
            name: facts.def.name,
            func_name: String::new(),
            fields,
            is_unique: facts.def.is_unique || facts.def.is_primary,
            is_primary: facts.def.is_primary,
        });
    }

    if table.kind == TableKind::Table
        && !table.primary_keys.is_empty()
        && !indexes.iter().any(|i| i.is_primary)
    {
        let name = format!("{}_pkey", table.name);
        tracing::debug!("synthesizing primary index '{}'", name);
        indexes.insert(
            0,
            Index {
                name,
                func_name: String::new(),
                fields: table.primary_keys.clone(),
                is_unique: true,
                is_primary: true,
            },
        );
    }

    let mut used = HashSet::new();
    for index in &mut indexes {
        let mut func_name =
            index_func_name(&table.name, index.fields.iter().map(|f| f.name.as_str()));
        if !used.insert(func_name.clone()) {
            func_name = format!("{}_{}", func_name, to_snake_case(&index.name));
            used.insert(func_name.clone());
        }
        index.func_name = func_name;
    }

    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{
        RawColumn, RawEnum, RawEnumValue, RawIndex, RawIndexColumn, RawProc, RawProcParam,
        RawTable, StaticLoader,
    };

    fn column(ordinal: i32, name: &str, ty: &str) -> RawColumn {
        RawColumn {
            ordinal,
            name: name.to_string(),
            datatype: Datatype::new(ty),
            ..RawColumn::default()
        }
    }

    fn table(name: &str, columns: Vec<RawColumn>) -> TableFacts {
        TableFacts {
            def: RawTable {
                kind: TableKind::Table,
                name: name.to_string(),
                ..RawTable::default()
            },
            columns,
            ..TableFacts::default()
        }
    }

    fn fk(name: &str, column: &str, ref_table: &str, ref_column: &str) -> RawForeignKey {
        RawForeignKey {
            name: name.to_string(),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            key_id: 1,
        }
    }

    fn blog_facts() -> Facts {
        let mut facts = Facts::new("postgres", "public");

        let mut id = column(1, "id", "integer");
        id.is_primary = true;
        id.is_sequence = true;
        // Deliberately out of ordinal order.
        facts.tables.push(table(
            "author",
            vec![column(3, "email", "text"), id.clone(), column(2, "name", "text")],
        ));

        let mut post = table(
            "post",
            vec![id, column(2, "author_id", "integer"), column(3, "title", "text")],
        );
        post.indexes.push(IndexFacts {
            def: RawIndex {
                name: "post_author_title_idx".to_string(),
                is_unique: false,
                is_primary: false,
            },
            columns: vec![
                RawIndexColumn {
                    seq_no: 2,
                    column: "title".to_string(),
                },
                RawIndexColumn {
                    seq_no: 1,
                    column: "author_id".to_string(),
                },
            ],
        });
        post.foreign_keys
            .push(fk("post_author_id_fkey", "author_id", "author", "id"));
        facts.tables.push(post);

        facts.enums.push(EnumFacts {
            def: RawEnum {
                name: "mood".to_string(),
                comment: String::new(),
            },
            values: vec![
                RawEnumValue {
                    name: "happy".to_string(),
                    const_value: 2,
                },
                RawEnumValue {
                    name: "sad".to_string(),
                    const_value: 1,
                },
            ],
        });

        facts.procs.push(ProcFacts {
            def: RawProc {
                name: "add".to_string(),
                returns: Datatype::new("integer"),
                comment: String::new(),
            },
            params: vec![
                RawProcParam {
                    name: "b".to_string(),
                    ordinal: 2,
                    datatype: Datatype::new("integer"),
                },
                RawProcParam {
                    name: "a".to_string(),
                    ordinal: 1,
                    datatype: Datatype::new("integer"),
                },
            ],
        });

        facts
    }

    #[test]
    fn test_build_orders_columns_by_ordinal() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        let author = schema.table("author").expect("author");
        let names: Vec<_> = author.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "email"]);
    }

    #[test]
    fn test_build_primary_keys_are_primary_subsequence() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        for table in schema.all_tables() {
            let expected: Vec<_> = table.columns.iter().filter(|c| c.is_primary).collect();
            let actual: Vec<_> = table.primary_keys.iter().collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_build_synthesizes_primary_index() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        let author = schema.table("author").expect("author");
        let pk = author.primary_index().expect("primary index");
        assert_eq!(pk.name, "author_pkey");
        assert!(pk.is_unique);
        assert_eq!(pk.func_name, "author_by_id");
    }

    #[test]
    fn test_build_orders_index_fields() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        let post = schema.table("post").expect("post");
        let idx = post
            .indexes
            .iter()
            .find(|i| i.name == "post_author_title_idx")
            .expect("index");
        let names: Vec<_> = idx.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["author_id", "title"]);
        assert_eq!(idx.func_name, "post_by_author_id_title");
    }

    #[test]
    fn test_build_resolves_foreign_keys() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        let post = schema.table("post").expect("post");
        let key = &post.foreign_keys[0];
        assert_eq!(key.ref_table, "author");
        assert_eq!(key.ref_index, "author_pkey");
        assert_eq!(key.ref_func_name, "author_by_id");
        assert_eq!(key.resolved_name, "author");
        assert_eq!(key.field.name, "author_id");
    }

    #[test]
    fn test_build_fk_modes() {
        let key = fk("post_author_id_fkey", "author_id", "author", "id");
        let field = Field::new("author_id", Datatype::new("integer"));

        let name = |mode| SchemaBuilder::new().fk_mode(mode).resolved_name(&key, &field);
        assert_eq!(name(FkMode::Parent), "author");
        assert_eq!(name(FkMode::Field), "author");
        assert_eq!(name(FkMode::Key), "post_author_id_fkey");

        let owner = Field::new("owner", Datatype::new("integer"));
        assert_eq!(
            SchemaBuilder::new().resolved_name(&key, &owner),
            "author",
            "smart mode falls back to the parent table"
        );
    }

    #[test]
    fn test_build_ambiguous_fk_names_use_constraint() {
        let mut facts = blog_facts();
        let post = &mut facts.tables[1];
        post.columns.push(column(4, "editor_id", "integer"));
        let mut second = fk("post_editor_fkey", "editor_id", "author", "id");
        second.key_id = 2;
        post.foreign_keys.push(second);

        let schema = SchemaBuilder::new()
            .fk_mode(FkMode::Parent)
            .build(facts)
            .expect("Failed to build");
        let post = schema.table("post").expect("post");
        let names: Vec<_> = post
            .foreign_keys
            .iter()
            .map(|k| k.resolved_name.as_str())
            .collect();
        assert_eq!(names, ["post_author_id_fkey", "post_editor_fkey"]);
    }

    #[test]
    fn test_build_dangling_foreign_key() {
        let mut facts = blog_facts();
        facts.tables[1]
            .foreign_keys
            .push(fk("post_ghost_fkey", "author_id", "ghost", "id"));

        let err = SchemaBuilder::new().build(facts).expect_err("should fail");
        assert!(matches!(
            err,
            SchemaError::DanglingForeignKey { ref ref_table, .. } if ref_table == "ghost"
        ));
    }

    #[test]
    fn test_build_unknown_index_column() {
        let mut facts = blog_facts();
        facts.tables[0].indexes.push(IndexFacts {
            def: RawIndex {
                name: "author_bogus_idx".to_string(),
                ..RawIndex::default()
            },
            columns: vec![RawIndexColumn {
                seq_no: 1,
                column: "bogus".to_string(),
            }],
        });
        let err = SchemaBuilder::new().build(facts).expect_err("should fail");
        assert!(matches!(err, SchemaError::UnknownColumn { ref column, .. } if column == "bogus"));
    }

    #[test]
    fn test_build_duplicate_table() {
        let mut facts = blog_facts();
        facts.tables.push(table("author", vec![]));
        let err = SchemaBuilder::new().build(facts).expect_err("should fail");
        assert!(matches!(err, SchemaError::DuplicateEntity { ref kind, .. } if kind == "table"));
    }

    #[test]
    fn test_build_enum_and_proc_ordering() {
        let schema = SchemaBuilder::new().build(blog_facts()).expect("Failed to build");
        let mood = schema.enum_def("mood").expect("mood");
        let values: Vec<_> = mood.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(values, ["sad", "happy"]);

        let add = schema.proc_def("add").expect("add");
        let params: Vec<_> = add.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, ["a", "b"]);
        assert_eq!(add.return_field.datatype.type_name, "integer");
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = SchemaBuilder::new();
        let first = builder.build(blog_facts()).expect("Failed to build");
        let second = builder
            .build(Facts::from_schema(&first))
            .expect("Failed to rebuild");
        assert_eq!(first, second);
    }

    #[test]
    fn test_fk_mode_from_str() {
        assert_eq!("PARENT".parse::<FkMode>().expect("parse"), FkMode::Parent);
        assert_eq!("".parse::<FkMode>().expect("parse"), FkMode::Smart);
        assert!("sideways".parse::<FkMode>().is_err());
    }

    #[tokio::test]
    async fn test_load_from_static_loader() {
        let loader = StaticLoader::new(blog_facts());
        let cancel = CancellationToken::new();
        let schema = SchemaBuilder::new()
            .load(&loader, "public", &cancel)
            .await
            .expect("Failed to load");
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.driver, "postgres");
    }

    #[tokio::test]
    async fn test_load_cancelled() {
        let loader = StaticLoader::new(blog_facts());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = SchemaBuilder::new()
            .load(&loader, "public", &cancel)
            .await
            .expect_err("should be cancelled");
        assert!(matches!(err, SchemaError::Cancelled));
    }

    #[tokio::test]
    async fn test_load_wraps_loader_errors() {
        let loader = StaticLoader::new(blog_facts());
        let cancel = CancellationToken::new();
        let err = SchemaBuilder::new()
            .load(&loader, "other", &cancel)
            .await
            .expect_err("should fail");
        assert!(matches!(err, SchemaError::Load { ref operation, .. } if operation == "enums"));
    }
}
