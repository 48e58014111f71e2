//! Schema IR type definitions.
//!
//! Every record here is produced by the [`builder`](crate::builder) from raw
//! loader facts, or supplied by hand. Records own their children by value;
//! cross-table references (foreign keys) are by name only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Underlying SQL datatype of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Datatype {
    /// Database type name, as reported by the driver.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Numeric precision (or length for character types).
    pub prec: i32,
    /// Numeric scale.
    pub scale: i32,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the type is an array of `type_name`.
    pub array: bool,
}

impl Datatype {
    /// Creates a non-null scalar datatype.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Returns a nullable copy.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns an array copy.
    #[must_use]
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub fn with_precision(mut self, prec: i32, scale: i32) -> Self {
        self.prec = prec;
        self.scale = scale;
        self
    }
}

/// A column, index member, enum value, or procedure parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field datatype.
    pub datatype: Datatype,
    /// Default value literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Comment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Part of the primary key.
    pub is_primary: bool,
    /// Auto-increment / sequence backed.
    pub is_sequence: bool,
    /// Constant value (enum values only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub const_value: Option<i64>,
    /// Substituted into query text instead of bound as a parameter.
    pub interpolate: bool,
    /// Synthesized from a foreign-key traversal.
    pub join: bool,
}

impl Field {
    /// Creates a field with the given name and datatype.
    #[must_use]
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            datatype,
            ..Self::default()
        }
    }

    /// Marks the field as part of the primary key.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Marks the field as sequence backed.
    #[must_use]
    pub fn sequence(mut self) -> Self {
        self.is_sequence = true;
        self
    }

    /// Sets the constant value.
    #[must_use]
    pub fn with_const(mut self, value: i64) -> Self {
        self.const_value = Some(value);
        self
    }
}

/// Whether a [`Table`] is a base table or a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Base table.
    #[default]
    Table,
    /// View.
    View,
}

impl TableKind {
    /// Returns the lower-case kind tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table or view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    /// Table or view.
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// Table name.
    #[serde(rename = "table_name")]
    pub name: String,
    /// Columns in ordinal order.
    #[serde(rename = "fields")]
    pub columns: Vec<Field>,
    /// Primary key columns, in column order.
    pub primary_keys: Vec<Field>,
    /// Indexes.
    pub indexes: Vec<Index>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
    /// Supplied by the user rather than introspected.
    pub manual: bool,
    /// Comment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Table {
    /// Creates an empty table of the given kind.
    #[must_use]
    pub fn new(kind: TableKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Field> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if this is a view.
    #[must_use]
    pub fn is_view(&self) -> bool {
        self.kind == TableKind::View
    }

    /// Returns the primary index, if one exists.
    #[must_use]
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary)
    }

    /// Columns that are not sequence backed (the ones an insert supplies).
    pub fn insertable_columns(&self) -> impl Iterator<Item = &Field> {
        self.columns.iter().filter(|c| !c.is_sequence)
    }

    /// Columns that are not part of the primary key.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &Field> {
        self.columns.iter().filter(|c| !c.is_primary)
    }
}

/// An index on a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Derived lookup function name.
    pub func_name: String,
    /// Participating fields, in index order.
    pub fields: Vec<Field>,
    /// Unique index.
    pub is_unique: bool,
    /// Primary key index. Implies `is_unique`.
    pub is_primary: bool,
}

/// A foreign key on a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Render-ready name, per the foreign key naming mode.
    pub resolved_name: String,
    /// Column carrying the key.
    #[serde(rename = "column")]
    pub field: Field,
    /// Name of the index on the referenced table.
    pub ref_index: String,
    /// Referenced table name.
    pub ref_table: String,
    /// Referenced column.
    #[serde(rename = "ref_column")]
    pub ref_field: Field,
    /// Lookup function name derived from the referenced index.
    pub ref_func_name: String,
}

/// An enum type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enum {
    /// Enum name.
    pub name: String,
    /// Values, in declaration order.
    pub values: Vec<Field>,
    /// Comment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

/// A stored procedure or function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proc {
    /// Procedure name.
    pub name: String,
    /// Parameters, in ordinal order.
    pub params: Vec<Field>,
    /// Return value.
    #[serde(rename = "return")]
    pub return_field: Field,
    /// Comment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Proc {
    /// Returns true if the procedure returns nothing.
    #[must_use]
    pub fn is_void(&self) -> bool {
        let ty = self.return_field.datatype.type_name.as_str();
        ty.is_empty() || ty.eq_ignore_ascii_case("void")
    }
}

/// A database schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Driver identifier (postgres, mysql, sqlite3, sqlserver, oracle).
    #[serde(rename = "type")]
    pub driver: String,
    /// Schema name.
    pub name: String,
    /// Enums.
    pub enums: Vec<Enum>,
    /// Stored procedures.
    pub procs: Vec<Proc>,
    /// Tables.
    pub tables: Vec<Table>,
    /// Views.
    pub views: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new(driver: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a table or view by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .chain(self.views.iter())
            .find(|t| t.name == name)
    }

    /// Looks up an enum by name.
    #[must_use]
    pub fn enum_def(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Looks up a stored procedure by name.
    #[must_use]
    pub fn proc_def(&self, name: &str) -> Option<&Proc> {
        self.procs.iter().find(|p| p.name == name)
    }

    /// Iterates tables followed by views.
    pub fn all_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().chain(self.views.iter())
    }
}
