//! Loader interface and raw schema facts.
//!
//! A [`Loader`] is implemented once per database engine and returns raw,
//! unordered facts about one schema. [`Facts`] is the collected snapshot of
//! those facts; the [`builder`](crate::builder) turns it into a [`Schema`].

use crate::error::{LoadError, SchemaError};
use crate::types::{Datatype, Schema, TableKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw enum definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEnum {
    /// Enum name.
    pub name: String,
    /// Comment.
    pub comment: String,
}

/// Raw enum value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEnumValue {
    /// Value label.
    pub name: String,
    /// Declaration ordinal.
    pub const_value: i64,
}

/// Raw stored procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProc {
    /// Procedure name.
    pub name: String,
    /// Return type; empty or `void` for procedures without a result.
    pub returns: Datatype,
    /// Comment.
    pub comment: String,
}

/// Raw stored procedure parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProcParam {
    /// Parameter name.
    pub name: String,
    /// Ordinal position.
    pub ordinal: i32,
    /// Parameter type.
    pub datatype: Datatype,
}

/// Raw table or view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTable {
    /// Table or view.
    pub kind: TableKind,
    /// Table name.
    pub name: String,
    /// Supplied by the user rather than introspected.
    pub manual: bool,
    /// Comment.
    pub comment: String,
}

/// Raw column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawColumn {
    /// Ordinal position within the table.
    pub ordinal: i32,
    /// Column name.
    pub name: String,
    /// Column type.
    pub datatype: Datatype,
    /// Default value literal.
    pub default: Option<String>,
    /// Part of the primary key.
    pub is_primary: bool,
    /// Auto-increment / sequence backed.
    pub is_sequence: bool,
    /// Comment.
    pub comment: String,
}

/// Raw index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIndex {
    /// Index name.
    pub name: String,
    /// Unique index.
    pub is_unique: bool,
    /// Primary key index.
    pub is_primary: bool,
}

/// Raw index member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIndexColumn {
    /// Position within the index.
    pub seq_no: i32,
    /// Column name.
    pub column: String,
}

/// Raw foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawForeignKey {
    /// Constraint name.
    pub name: String,
    /// Column carrying the key.
    pub column: String,
    /// Referenced table.
    pub ref_table: String,
    /// Referenced column.
    pub ref_column: String,
    /// Driver key identifier, used to order keys.
    pub key_id: i32,
}

/// Abstract producer of raw schema facts, one implementation per engine.
///
/// Results may come back in any order; the builder normalizes them.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Driver identifier, e.g. `postgres`.
    fn driver(&self) -> &str;

    /// Lists enums.
    async fn enums(&self, schema: &str) -> Result<Vec<RawEnum>, LoadError>;

    /// Lists values of an enum.
    async fn enum_values(&self, schema: &str, enum_name: &str)
    -> Result<Vec<RawEnumValue>, LoadError>;

    /// Lists stored procedures.
    async fn procs(&self, schema: &str) -> Result<Vec<RawProc>, LoadError>;

    /// Lists parameters of a stored procedure.
    async fn proc_params(&self, schema: &str, proc_name: &str)
    -> Result<Vec<RawProcParam>, LoadError>;

    /// Lists tables or views.
    async fn tables(&self, schema: &str, kind: TableKind) -> Result<Vec<RawTable>, LoadError>;

    /// Lists columns of a table or view.
    async fn table_columns(&self, schema: &str, table: &str)
    -> Result<Vec<RawColumn>, LoadError>;

    /// Lists indexes of a table.
    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<RawIndex>, LoadError>;

    /// Lists columns of an index.
    async fn index_columns(
        &self,
        schema: &str,
        table: &str,
        index: &str,
    ) -> Result<Vec<RawIndexColumn>, LoadError>;

    /// Lists foreign keys of a table.
    async fn foreign_keys(&self, schema: &str, table: &str)
    -> Result<Vec<RawForeignKey>, LoadError>;
}

/// Facts about one enum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumFacts {
    /// Enum definition.
    #[serde(flatten)]
    pub def: RawEnum,
    /// Values.
    pub values: Vec<RawEnumValue>,
}

/// Facts about one stored procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcFacts {
    /// Procedure definition.
    #[serde(flatten)]
    pub def: RawProc,
    /// Parameters.
    pub params: Vec<RawProcParam>,
}

/// Facts about one index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexFacts {
    /// Index definition.
    #[serde(flatten)]
    pub def: RawIndex,
    /// Members.
    pub columns: Vec<RawIndexColumn>,
}

/// Facts about one table or view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFacts {
    /// Table definition.
    #[serde(flatten)]
    pub def: RawTable,
    /// Columns.
    pub columns: Vec<RawColumn>,
    /// Indexes.
    pub indexes: Vec<IndexFacts>,
    /// Foreign keys.
    pub foreign_keys: Vec<RawForeignKey>,
}

/// Snapshot of everything a loader reported for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facts {
    /// Driver identifier.
    pub driver: String,
    /// Schema name.
    pub schema: String,
    /// Enums.
    pub enums: Vec<EnumFacts>,
    /// Stored procedures.
    pub procs: Vec<ProcFacts>,
    /// Tables and views.
    pub tables: Vec<TableFacts>,
}

impl Facts {
    /// Creates an empty fact set.
    #[must_use]
    pub fn new(driver: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Decodes a JSON fact file.
    ///
    /// # Errors
    /// Returns `SchemaError::Json` if the document does not match the fact layout.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Re-derives the raw facts a loader would report for an already built schema.
    #[must_use]
    pub fn from_schema(schema: &Schema) -> Self {
        let enums = schema
            .enums
            .iter()
            .map(|e| EnumFacts {
                def: RawEnum {
                    name: e.name.clone(),
                    comment: e.comment.clone(),
                },
                values: e
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| RawEnumValue {
                        name: v.name.clone(),
                        const_value: v.const_value.unwrap_or(i as i64 + 1),
                    })
                    .collect(),
            })
            .collect();

        let procs = schema
            .procs
            .iter()
            .map(|p| ProcFacts {
                def: RawProc {
                    name: p.name.clone(),
                    returns: p.return_field.datatype.clone(),
                    comment: p.comment.clone(),
                },
                params: p
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, f)| RawProcParam {
                        name: f.name.clone(),
                        ordinal: i as i32 + 1,
                        datatype: f.datatype.clone(),
                    })
                    .collect(),
            })
            .collect();

        let tables = schema
            .all_tables()
            .map(|t| TableFacts {
                def: RawTable {
                    kind: t.kind,
                    name: t.name.clone(),
                    manual: t.manual,
                    comment: t.comment.clone(),
                },
                columns: t
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| RawColumn {
                        ordinal: i as i32 + 1,
                        name: c.name.clone(),
                        datatype: c.datatype.clone(),
                        default: c.default.clone(),
                        is_primary: c.is_primary,
                        is_sequence: c.is_sequence,
                        comment: c.comment.clone(),
                    })
                    .collect(),
                indexes: t
                    .indexes
                    .iter()
                    .map(|idx| IndexFacts {
                        def: RawIndex {
                            name: idx.name.clone(),
                            is_unique: idx.is_unique,
                            is_primary: idx.is_primary,
                        },
                        columns: idx
                            .fields
                            .iter()
                            .enumerate()
                            .map(|(i, f)| RawIndexColumn {
                                seq_no: i as i32 + 1,
                                column: f.name.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                foreign_keys: t
                    .foreign_keys
                    .iter()
                    .enumerate()
                    .map(|(i, fk)| RawForeignKey {
                        name: fk.name.clone(),
                        column: fk.field.name.clone(),
                        ref_table: fk.ref_table.clone(),
                        ref_column: fk.ref_field.name.clone(),
                        key_id: i as i32 + 1,
                    })
                    .collect(),
            })
            .collect();

        Self {
            driver: schema.driver.clone(),
            schema: schema.name.clone(),
            enums,
            procs,
            tables,
        }
    }

    fn table(&self, name: &str) -> Option<&TableFacts> {
        self.tables.iter().find(|t| t.def.name == name)
    }
}

/// A [`Loader`] serving a fixed [`Facts`] snapshot.
///
/// Used to replay recorded introspection results and in tests.
#[derive(Debug, Clone)]
pub struct StaticLoader {
    facts: Facts,
}

impl StaticLoader {
    /// Wraps a fact snapshot.
    #[must_use]
    pub fn new(facts: Facts) -> Self {
        Self { facts }
    }

    fn check_schema(&self, schema: &str) -> Result<(), LoadError> {
        if self.facts.schema == schema {
            Ok(())
        } else {
            Err(LoadError::new(format!("schema '{schema}' not found")))
        }
    }

    fn table(&self, table: &str) -> Result<&TableFacts, LoadError> {
        self.facts
            .table(table)
            .ok_or_else(|| LoadError::new(format!("table '{table}' not found")))
    }
}

#[async_trait]
impl Loader for StaticLoader {
    fn driver(&self) -> &str {
        &self.facts.driver
    }

    async fn enums(&self, schema: &str) -> Result<Vec<RawEnum>, LoadError> {
        self.check_schema(schema)?;
        Ok(self.facts.enums.iter().map(|e| e.def.clone()).collect())
    }

    async fn enum_values(
        &self,
        schema: &str,
        enum_name: &str,
    ) -> Result<Vec<RawEnumValue>, LoadError> {
        self.check_schema(schema)?;
        self.facts
            .enums
            .iter()
            .find(|e| e.def.name == enum_name)
            .map(|e| e.values.clone())
            .ok_or_else(|| LoadError::new(format!("enum '{enum_name}' not found")))
    }

    async fn procs(&self, schema: &str) -> Result<Vec<RawProc>, LoadError> {
        self.check_schema(schema)?;
        Ok(self.facts.procs.iter().map(|p| p.def.clone()).collect())
    }

    async fn proc_params(
        &self,
        schema: &str,
        proc_name: &str,
    ) -> Result<Vec<RawProcParam>, LoadError> {
        self.check_schema(schema)?;
        self.facts
            .procs
            .iter()
            .find(|p| p.def.name == proc_name)
            .map(|p| p.params.clone())
            .ok_or_else(|| LoadError::new(format!("proc '{proc_name}' not found")))
    }

    async fn tables(&self, schema: &str, kind: TableKind) -> Result<Vec<RawTable>, LoadError> {
        self.check_schema(schema)?;
        Ok(self
            .facts
            .tables
            .iter()
            .filter(|t| t.def.kind == kind)
            .map(|t| t.def.clone())
            .collect())
    }

    async fn table_columns(&self, schema: &str, table: &str) -> Result<Vec<RawColumn>, LoadError> {
        self.check_schema(schema)?;
        Ok(self.table(table)?.columns.clone())
    }

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<RawIndex>, LoadError> {
        self.check_schema(schema)?;
        Ok(self
            .table(table)?
            .indexes
            .iter()
            .map(|i| i.def.clone())
            .collect())
    }

    async fn index_columns(
        &self,
        schema: &str,
        table: &str,
        index: &str,
    ) -> Result<Vec<RawIndexColumn>, LoadError> {
        self.check_schema(schema)?;
        self.table(table)?
            .indexes
            .iter()
            .find(|i| i.def.name == index)
            .map(|i| i.columns.clone())
            .ok_or_else(|| LoadError::new(format!("index '{index}' not found on '{table}'")))
    }

    async fn foreign_keys(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawForeignKey>, LoadError> {
        self.check_schema(schema)?;
        Ok(self.table(table)?.foreign_keys.clone())
    }
}
