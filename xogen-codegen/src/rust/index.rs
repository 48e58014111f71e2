//! Index lookups and foreign key accessors.

use super::types::{arg_expr, is_copy, param_type};
use super::{
    bind_params, doc, fn_ident, ident, literal, locals, module_name, select_sql, table_columns,
    type_ident, where_sql,
};
use crate::error::RenderError;
use crate::template::{Entity, RenderContext};
use xogen_schema::{Datatype, ForeignKey, Index, Table};

/// Methods generated by the typedef template.
const METHODS: &[&str] = &["exists", "deleted", "insert", "update", "save", "delete", "from_row"];

/// Renders the lookup function of an index.
///
/// Unique indexes return at most one row, others every matching row.
///
/// # Errors
/// Returns `RenderError` if the entity is not an index.
pub fn render_index(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::Index { table, index } = ctx.entity() else {
        return Err(RenderError::new(format!("index cannot render {}", ctx.entity())));
    };
    let ty = type_ident(ctx, &table.name);
    let name = fn_ident(ctx, &index.func_name);

    let mut scope = locals(ctx);
    let mut params = Vec::with_capacity(index.fields.len());
    let mut args = Vec::with_capacity(index.fields.len());
    for field in &index.fields {
        let arg = ident(&mut scope, &field.name);
        let field_ty = ctx.type_of(&field.datatype);
        params.push(format!("{}: {}", arg, param_type(ctx, &field_ty)));
        args.push(arg);
    }
    let fields: Vec<_> = index.fields.iter().collect();
    let sql = format!("{} WHERE {}", select_sql(ctx, table), where_sql(ctx, &fields, 1));
    let ret = if index.is_unique {
        format!("Option<{}>", ty)
    } else {
        format!("Vec<{}>", ty)
    };

    out.push('\n');
    doc(out, "", &lookup_doc(table, index));
    out.push_str(&format!(
        "pub fn {}<D: Db>(db: &D{}) -> Result<{}, XoError> {{\n",
        name,
        params.iter().map(|p| format!(", {}", p)).collect::<String>(),
        ret
    ));
    out.push_str(&format!("    const SQL: &str = {};\n", literal(&sql)));
    bind_params(out, "    ", &args);
    if index.is_unique {
        out.push_str(&format!(
            "    db.query_one(SQL, &params)?.map(|row| {}::from_row(&row)).transpose()\n",
            ty
        ));
    } else {
        out.push_str("    let rows = db.query(SQL, &params)?;\n");
        out.push_str(&format!("    rows.iter().map({}::from_row).collect()\n", ty));
    }
    out.push_str("}\n");
    Ok(())
}

fn lookup_doc(table: &Table, index: &Index) -> String {
    let what = if index.is_unique {
        "the row"
    } else {
        "every row"
    };
    let mut text = format!(
        "Returns {} of '{}' matching the '{}' index.",
        what, table.name, index.name
    );
    if index.is_primary {
        text.push_str("\n\nLooks up by primary key.");
    }
    text
}

/// Renders the accessor following a foreign key.
///
/// The referenced index function is called when it is a unique
/// single-column index of the same type; otherwise the referenced row is
/// selected inline.
///
/// # Errors
/// Returns `RenderError` if the entity is not a foreign key or the
/// referenced table is missing.
pub fn render_foreign_key(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::ForeignKey { table, key } = ctx.entity() else {
        return Err(RenderError::new(format!("foreignkey cannot render {}", ctx.entity())));
    };
    let ref_table = ctx
        .schema()
        .and_then(|s| s.table(&key.ref_table))
        .ok_or_else(|| {
            RenderError::new(format!(
                "foreign key '{}' references missing table '{}'",
                key.name, key.ref_table
            ))
        })?;

    let owner = type_ident(ctx, &table.name);
    let module = module_name(&ref_table.name);
    let ref_ty = format!("super::{}::{}", module, type_ident(ctx, &ref_table.name));
    let method = {
        let mut scope = ctx.scope();
        for name in METHODS {
            scope.reserve(*name);
        }
        ident(&mut scope, &key.resolved_name)
    };
    let field = table_columns(ctx, table)
        .into_iter()
        .find(|c| c.field.name == key.field.name)
        .ok_or_else(|| {
            RenderError::new(format!(
                "foreign key '{}' uses missing column '{}'",
                key.name, key.field.name
            ))
        })?;

    out.push_str(&format!("\nimpl {} {{\n", owner));
    doc(
        out,
        "    ",
        &format!(
            "Returns the '{}' row referenced by '{}'.",
            ref_table.name, key.field.name
        ),
    );
    out.push_str(&format!(
        "    pub fn {}<D: Db>(&self, db: &D) -> Result<Option<{}>, XoError> {{\n",
        method, ref_ty
    ));

    let nullable = field.field.datatype.nullable;
    let base = if nullable {
        ctx.type_of(&Datatype {
            nullable: false,
            ..field.field.datatype.clone()
        })
    } else {
        field.ty.clone()
    };
    match lookup_fn(ctx, ref_table, key, &base) {
        Some(func) => {
            let call = format!("super::{}::{}", module, func);
            let value = format!("self.{}", field.ident);
            if nullable {
                let target = if is_copy(ctx, &base) {
                    value
                } else {
                    format!("&{}", value)
                };
                out.push_str(&format!("        match {} {{\n", target));
                out.push_str(&format!("            Some(v) => {}(db, v),\n", call));
                out.push_str("            None => Ok(None),\n");
                out.push_str("        }\n");
            } else {
                out.push_str(&format!(
                    "        {}(db, {})\n",
                    call,
                    arg_expr(ctx, &base, &value)
                ));
            }
        }
        None => {
            let sql = format!(
                "{} WHERE {}",
                select_sql(ctx, ref_table),
                where_sql(ctx, &[&key.ref_field], 1)
            );
            out.push_str(&format!("        const SQL: &str = {};\n", literal(&sql)));
            bind_params(out, "        ", &[format!("self.{}", field.ident)]);
            out.push_str(&format!(
                "        db.query_one(SQL, &params)?.map(|row| {}::from_row(&row)).transpose()\n",
                ref_ty
            ));
        }
    }
    out.push_str("    }\n");
    out.push_str("}\n");
    Ok(())
}

/// Returns the referenced index function if it can be called with the key
/// column.
fn lookup_fn(
    ctx: &RenderContext<'_>,
    ref_table: &Table,
    key: &ForeignKey,
    base: &str,
) -> Option<String> {
    let index = ref_table.indexes.iter().find(|i| i.name == key.ref_index)?;
    if !index.is_unique || index.fields.len() != 1 {
        return None;
    }
    let ref_ty = ctx.type_of(&index.fields[0].datatype);
    (ref_ty == base).then(|| fn_ident(ctx, &index.func_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rust::template_set;
    use crate::template::Helpers;
    use xogen_schema::{Field, Schema, TableKind, Xo};

    fn helpers() -> Helpers {
        let set = template_set();
        let config = Config {
            int32_type: "i32".to_string(),
            conflict_suffix: "_val".to_string(),
            ..Config::default()
        };
        (set.funcs)(&config, set.resolver.clone())
    }

    fn author() -> Table {
        let id = Field::new("id", Datatype::new("integer")).primary().sequence();
        let mut table = Table::new(TableKind::Table, "author");
        table.columns = vec![id.clone(), Field::new("name", Datatype::new("text"))];
        table.primary_keys = vec![id.clone()];
        table.indexes = vec![Index {
            name: "author_pkey".to_string(),
            func_name: "author_by_id".to_string(),
            fields: vec![id],
            is_unique: true,
            is_primary: true,
        }];
        table
    }

    fn post(nullable: bool) -> Table {
        let mut author_id = Field::new("author_id", Datatype::new("integer"));
        author_id.datatype.nullable = nullable;
        let mut table = Table::new(TableKind::Table, "post");
        table.columns = vec![
            Field::new("id", Datatype::new("integer")).primary(),
            author_id.clone(),
        ];
        table.foreign_keys = vec![ForeignKey {
            name: "post_author_id_fkey".to_string(),
            resolved_name: "author".to_string(),
            field: author_id,
            ref_index: "author_pkey".to_string(),
            ref_table: "author".to_string(),
            ref_field: Field::new("id", Datatype::new("integer")),
            ref_func_name: "author_by_id".to_string(),
        }];
        table
    }

    fn schema(nullable: bool) -> Schema {
        let mut schema = Schema::new("postgres", "public");
        schema.tables = vec![author(), post(nullable)];
        schema
    }

    fn render_with(
        schema: &Schema,
        entity: impl FnOnce(&Schema) -> Entity<'_>,
        render: fn(&RenderContext<'_>, &mut String) -> Result<(), RenderError>,
    ) -> String {
        let helpers = helpers();
        let xo = Xo::new();
        let ctx = RenderContext::new(entity(schema), &xo, &helpers).in_schema(schema);
        let mut out = String::new();
        render(&ctx, &mut out).expect("Failed to render");
        out
    }

    #[test]
    fn test_unique_index_returns_option() {
        let schema = schema(false);
        let out = render_with(
            &schema,
            |s| Entity::Index {
                table: &s.tables[0],
                index: &s.tables[0].indexes[0],
            },
            render_index,
        );
        assert!(out.contains(
            "pub fn author_by_id<D: Db>(db: &D, id: i32) -> Result<Option<Author>, XoError> {"
        ));
        assert!(out.contains("\"SELECT id, name FROM public.author WHERE id = $1\""));
        assert!(out.contains(".transpose()"));
        syn::parse_file(&out).expect("index should parse");
    }

    #[test]
    fn test_non_unique_index_returns_vec() {
        let mut schema = schema(false);
        schema.tables[1].indexes.push(Index {
            name: "post_author_id_idx".to_string(),
            func_name: "posts_by_author_id".to_string(),
            fields: vec![Field::new("author_id", Datatype::new("text"))],
            is_unique: false,
            is_primary: false,
        });
        let out = render_with(
            &schema,
            |s| Entity::Index {
                table: &s.tables[1],
                index: &s.tables[1].indexes[0],
            },
            render_index,
        );
        assert!(out.contains("(db: &D, author_id: &str) -> Result<Vec<Post>, XoError>"));
        assert!(out.contains("rows.iter().map(Post::from_row).collect()"));
        syn::parse_file(&out).expect("index should parse");
    }

    #[test]
    fn test_index_parameters_avoid_locals() {
        let mut schema = schema(false);
        schema.tables[0].indexes[0].fields = vec![Field::new("params", Datatype::new("integer"))];
        let out = render_with(
            &schema,
            |s| Entity::Index {
                table: &s.tables[0],
                index: &s.tables[0].indexes[0],
            },
            render_index,
        );
        assert!(out.contains("params_val: i32"));
        assert!(out.contains("let params = [params_val.to_value()];"));
    }

    #[test]
    fn test_foreign_key_calls_ref_index() {
        let schema = schema(false);
        let out = render_with(
            &schema,
            |s| Entity::ForeignKey {
                table: &s.tables[1],
                key: &s.tables[1].foreign_keys[0],
            },
            render_foreign_key,
        );
        assert!(out.contains("impl Post {"));
        assert!(out.contains(
            "pub fn author<D: Db>(&self, db: &D) -> Result<Option<super::author::Author>, XoError>"
        ));
        assert!(out.contains("super::author::author_by_id(db, self.author_id)"));
        syn::parse_file(&out).expect("foreign key should parse");
    }

    #[test]
    fn test_nullable_foreign_key_matches() {
        let schema = schema(true);
        let out = render_with(
            &schema,
            |s| Entity::ForeignKey {
                table: &s.tables[1],
                key: &s.tables[1].foreign_keys[0],
            },
            render_foreign_key,
        );
        assert!(out.contains("match self.author_id {"));
        assert!(out.contains("Some(v) => super::author::author_by_id(db, v),"));
        syn::parse_file(&out).expect("foreign key should parse");
    }

    #[test]
    fn test_foreign_key_without_unique_index_selects_inline() {
        let mut schema = schema(false);
        schema.tables[0].indexes.clear();
        let out = render_with(
            &schema,
            |s| Entity::ForeignKey {
                table: &s.tables[1],
                key: &s.tables[1].foreign_keys[0],
            },
            render_foreign_key,
        );
        assert!(out.contains("\"SELECT id, name FROM public.author WHERE id = $1\""));
        assert!(out.contains("super::author::Author::from_row(&row)"));
        syn::parse_file(&out).expect("foreign key should parse");
    }

    #[test]
    fn test_foreign_key_name_avoids_methods() {
        let mut schema = schema(false);
        schema.tables[1].foreign_keys[0].resolved_name = "delete".to_string();
        let out = render_with(
            &schema,
            |s| Entity::ForeignKey {
                table: &s.tables[1],
                key: &s.tables[1].foreign_keys[0],
            },
            render_foreign_key,
        );
        assert!(out.contains("pub fn delete_val<D: Db>"));
    }
}
