//! Schema validation.
//!
//! Checks the structural invariants of a [`Schema`], whether it came from the
//! builder or was supplied by hand.

use crate::error::SchemaError;
use crate::types::{Schema, Table};
use std::collections::HashSet;

/// Validates a schema for correctness.
///
/// # Errors
/// Returns `SchemaError::DuplicateEntity` for name clashes,
/// `SchemaError::DanglingForeignKey` for keys referencing unknown tables,
/// `SchemaError::UnknownColumn` for keys or indexes over unknown columns, and
/// `SchemaError::Invalid` for other broken invariants.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaError> {
    validate_names(schema)?;
    for table in schema.all_tables() {
        validate_table(table)?;
        validate_foreign_keys(schema, table)?;
    }
    Ok(())
}

/// Validates that enum, proc and table names are unique.
fn validate_names(schema: &Schema) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for table in schema.all_tables() {
        if !seen.insert(table.name.as_str()) {
            return Err(SchemaError::duplicate("table", &schema.name, &table.name));
        }
    }

    let mut seen = HashSet::new();
    for enum_def in &schema.enums {
        if !seen.insert(enum_def.name.as_str()) {
            return Err(SchemaError::duplicate("enum", &schema.name, &enum_def.name));
        }
        let mut values = HashSet::new();
        for value in &enum_def.values {
            if !values.insert(value.name.as_str()) {
                return Err(SchemaError::duplicate("enum value", &enum_def.name, &value.name));
            }
        }
    }

    let mut seen = HashSet::new();
    for proc_def in &schema.procs {
        if !seen.insert(proc_def.name.as_str()) {
            return Err(SchemaError::duplicate("proc", &schema.name, &proc_def.name));
        }
    }

    Ok(())
}

/// Validates columns, primary keys and indexes of one table.
fn validate_table(table: &Table) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            return Err(SchemaError::duplicate("column", &table.name, &column.name));
        }
    }

    for key in &table.primary_keys {
        if table.column(&key.name).is_none() {
            return Err(SchemaError::unknown_column(
                &table.name,
                &key.name,
                "primary key",
            ));
        }
    }

    for index in &table.indexes {
        if index.is_primary && !index.is_unique {
            return Err(SchemaError::invalid(format!(
                "primary index '{}' on '{}' is not unique",
                index.name, table.name
            )));
        }
        for field in &index.fields {
            if table.column(&field.name).is_none() {
                return Err(SchemaError::unknown_column(
                    &table.name,
                    &field.name,
                    format!("index '{}'", index.name),
                ));
            }
        }
    }

    Ok(())
}

/// Validates that every foreign key resolves.
fn validate_foreign_keys(schema: &Schema, table: &Table) -> Result<(), SchemaError> {
    for key in &table.foreign_keys {
        if table.column(&key.field.name).is_none() {
            return Err(SchemaError::unknown_column(
                &table.name,
                &key.field.name,
                format!("foreign key '{}'", key.name),
            ));
        }
        let Some(ref_table) = schema.table(&key.ref_table) else {
            return Err(SchemaError::DanglingForeignKey {
                table: table.name.clone(),
                key: key.name.clone(),
                ref_table: key.ref_table.clone(),
            });
        };
        if ref_table.column(&key.ref_field.name).is_none() {
            return Err(SchemaError::unknown_column(
                &ref_table.name,
                &key.ref_field.name,
                format!("foreign key '{}' on '{}'", key.name, table.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Datatype, Field, ForeignKey, Index, TableKind};

    fn user() -> Table {
        let mut table = Table::new(TableKind::Table, "user");
        table.columns = vec![
            Field::new("id", Datatype::new("int")).primary().sequence(),
            Field::new("name", Datatype::new("string")),
        ];
        table.primary_keys = vec![table.columns[0].clone()];
        table
    }

    fn schema_with(table: Table) -> Schema {
        let mut schema = Schema::new("postgres", "public");
        schema.tables.push(table);
        schema
    }

    #[test]
    fn test_validate_valid_schema() {
        assert!(validate_schema(&schema_with(user())).is_ok());
    }

    #[test]
    fn test_validate_duplicate_table_and_view() {
        let mut schema = schema_with(user());
        schema.views.push(Table::new(TableKind::View, "user"));
        let err = validate_schema(&schema).expect_err("should fail");
        assert!(matches!(err, SchemaError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_validate_primary_key_outside_columns() {
        let mut table = user();
        table
            .primary_keys
            .push(Field::new("ghost_id", Datatype::new("int")));
        let err = validate_schema(&schema_with(table)).expect_err("should fail");
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
    }

    #[test]
    fn test_validate_primary_index_must_be_unique() {
        let mut table = user();
        table.indexes.push(Index {
            name: "user_pkey".to_string(),
            func_name: "user_by_id".to_string(),
            fields: vec![table.columns[0].clone()],
            is_unique: false,
            is_primary: true,
        });
        let err = validate_schema(&schema_with(table)).expect_err("should fail");
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn test_validate_dangling_foreign_key() {
        let mut table = user();
        table.foreign_keys.push(ForeignKey {
            name: "user_ghost_fkey".to_string(),
            field: table.columns[0].clone(),
            ref_table: "ghost".to_string(),
            ref_field: Field::new("id", Datatype::new("int")),
            ..ForeignKey::default()
        });
        let err = validate_schema(&schema_with(table)).expect_err("should fail");
        assert!(matches!(err, SchemaError::DanglingForeignKey { .. }));
    }
}
