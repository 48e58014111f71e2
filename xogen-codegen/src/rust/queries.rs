//! Hand-written query functions.

use super::types::param_type;
use super::{Column, bind_params, columns, doc, fn_ident, ident, literal, locals, type_ident};
use crate::error::RenderError;
use crate::template::{Entity, RenderContext};
use xogen_schema::Query;

/// A function parameter of a query.
struct Param {
    name: String,
    ident: String,
    ty: String,
}

/// Renders a query function and, unless it is exec or flat, its result
/// struct.
///
/// # Errors
/// Returns `RenderError` if the entity is not a query, or a flat query has
/// no result columns.
pub fn render(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::Query(query) = ctx.entity() else {
        return Err(RenderError::new(format!("query cannot render {}", ctx.entity())));
    };
    if query.flat && !query.exec && query.fields.is_empty() {
        return Err(RenderError::new(format!(
            "flat query '{}' has no result columns",
            query.name
        )));
    }

    let mut field_scope = ctx.scope();
    let fields = columns(ctx, &mut field_scope, &query.fields);
    let result = if query.exec || query.flat {
        None
    } else {
        let name = type_ident(ctx, &query.type_name);
        render_struct(query, &name, &fields, out);
        Some(name)
    };

    let params = params(ctx, query);
    let item = match &result {
        Some(name) => name.clone(),
        None if fields.len() == 1 => fields[0].ty.clone(),
        None => format!(
            "({})",
            fields.iter().map(|f| f.ty.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };
    let ret = if query.exec {
        "()".to_string()
    } else if query.one {
        format!("Option<{}>", item)
    } else {
        format!("Vec<{}>", item)
    };

    out.push('\n');
    if !query.comment.is_empty() {
        doc(out, "", &query.comment);
    } else if !query.comments.is_empty() {
        doc(out, "", &query.comments.join("\n"));
    } else {
        doc(out, "", &format!("Runs the '{}' query.", query.name));
    }
    out.push_str(&format!(
        "pub fn {}<D: Db>(db: &D{}) -> Result<{}, XoError> {{\n",
        fn_ident(ctx, &query.name),
        params
            .iter()
            .map(|p| format!(", {}: {}", p.ident, p.ty))
            .collect::<String>(),
        ret
    ));

    let sql = if query.interpolate {
        out.push_str(&format!(
            "    let sql = format!({});\n",
            literal(&format_string(&query.sql(), query, &params))
        ));
        "&sql"
    } else {
        out.push_str(&format!("    const SQL: &str = {};\n", literal(&query.sql())));
        "SQL"
    };
    let bound: Vec<String> = query
        .bound_params()
        .filter_map(|b| params.iter().find(|p| p.name == b.name))
        .map(|p| p.ident.clone())
        .collect();
    bind_params(out, "    ", &bound);

    if query.exec {
        out.push_str(&format!("    db.exec({}, &params)?;\n", sql));
        out.push_str("    Ok(())\n");
    } else {
        let decode = match &result {
            Some(name) => format!("{}::from_row(row)", name),
            None if fields.len() == 1 => "row.get(0)".to_string(),
            None => format!(
                "Ok(({}))",
                (0..fields.len())
                    .map(|i| format!("row.get({})?", i))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let closure = format!("|row| -> Result<{}, XoError> {{ {} }}", item, decode);
        if query.one {
            out.push_str(&format!(
                "    db.query_one({}, &params)?.as_ref().map({}).transpose()\n",
                sql, closure
            ));
        } else {
            out.push_str(&format!("    let rows = db.query({}, &params)?;\n", sql));
            out.push_str(&format!("    rows.iter().map({}).collect()\n", closure));
        }
    }
    out.push_str("}\n");
    Ok(())
}

fn render_struct(query: &Query, name: &str, fields: &[Column<'_>], out: &mut String) {
    if query.type_comment.is_empty() {
        doc(out, "", &format!("Result of the '{}' query.", query.name));
    } else {
        doc(out, "", &query.type_comment);
    }
    out.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
    out.push_str(&format!("pub struct {} {{\n", name));
    for field in fields {
        if !field.field.comment.is_empty() {
            doc(out, "    ", &field.field.comment);
        }
        out.push_str(&format!("    pub {}: {},\n", field.ident, field.ty));
    }
    out.push_str("}\n\n");

    let row = if fields.is_empty() { "_row" } else { "row" };
    out.push_str(&format!("impl {} {{\n", name));
    out.push_str("    /// Decodes a result row.\n");
    out.push_str(&format!(
        "    pub fn from_row<R: Row>({}: &R) -> Result<Self, XoError> {{\n",
        row
    ));
    out.push_str("        Ok(Self {\n");
    for (i, field) in fields.iter().enumerate() {
        out.push_str(&format!("            {}: row.get({})?,\n", field.ident, i));
    }
    out.push_str("        })\n");
    out.push_str("    }\n");
    out.push_str("}\n");
}

/// Returns the function parameters, one per distinct name.
fn params(ctx: &RenderContext<'_>, query: &Query) -> Vec<Param> {
    let mut scope = locals(ctx);
    let mut params: Vec<Param> = Vec::new();
    for field in &query.params {
        if params.iter().any(|p| p.name == field.name) {
            continue;
        }
        let ty = if field.interpolate {
            "&str".to_string()
        } else {
            param_type(ctx, &ctx.type_of(&field.datatype))
        };
        params.push(Param {
            name: field.name.clone(),
            ident: ident(&mut scope, &field.name),
            ty,
        });
    }
    params
}

/// Turns query text into a `format!` string, substituting interpolated
/// parameters and escaping every other brace.
fn format_string(sql: &str, query: &Query, params: &[Param]) -> String {
    let interpolated: Vec<&Param> = params
        .iter()
        .filter(|p| {
            query
                .params
                .iter()
                .any(|f| f.interpolate && f.name == p.name)
        })
        .collect();

    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(c) = rest.chars().next() {
        if c == '{' {
            let found = interpolated.iter().find(|p| {
                rest[1..]
                    .strip_prefix(p.name.as_str())
                    .is_some_and(|r| r.starts_with('}'))
            });
            if let Some(param) = found {
                out.push('{');
                out.push_str(&param.ident);
                out.push('}');
                rest = &rest[param.name.len() + 2..];
                continue;
            }
            out.push_str("{{");
        } else if c == '}' {
            out.push_str("}}");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rust::template_set;
    use xogen_schema::{Datatype, Field, QueryBuilder, Xo};

    fn render_query(query: &Query) -> Result<String, RenderError> {
        let set = template_set();
        let config = Config {
            int32_type: "i32".to_string(),
            ..Config::default()
        };
        let helpers = (set.funcs)(&config, set.resolver.clone());
        let xo = Xo::new();
        let ctx = RenderContext::new(Entity::Query(query), &xo, &helpers);
        let mut out = String::new();
        render(&ctx, &mut out)?;
        Ok(out)
    }

    fn fields() -> Vec<Field> {
        vec![
            Field::new("id", Datatype::new("integer")),
            Field::new("name", Datatype::new("text")),
        ]
    }

    #[test]
    fn test_query_with_result_struct() {
        let query = QueryBuilder::new("postgres", "authors_by_name")
            .sql("SELECT id, name FROM author WHERE name = %%name text%% OR alias = %%name text%%")
            .fields(fields())
            .build()
            .expect("Failed to build query");
        let out = render_query(&query).expect("Failed to render");

        assert!(out.contains("pub struct AuthorsByName {"));
        assert!(out.contains(
            "pub fn authors_by_name<D: Db>(db: &D, name: &str) -> Result<Vec<AuthorsByName>, XoError>"
        ));
        assert!(out.contains("let params = [name.to_value()];"));
        assert!(out.contains("AuthorsByName::from_row(row)"));
        syn::parse_file(&out).expect("query should parse");
    }

    #[test]
    fn test_positional_driver_binds_every_occurrence() {
        let query = QueryBuilder::new("mysql", "touch")
            .exec()
            .sql("UPDATE t SET a = %%v int%% WHERE b = %%v int%%")
            .build()
            .expect("Failed to build query");
        let out = render_query(&query).expect("Failed to render");

        assert!(out.contains("(db: &D, v_val: i32) -> Result<(), XoError>"));
        assert!(out.contains("let params = [v_val.to_value(), v_val.to_value()];"));
        assert!(out.contains("db.exec(SQL, &params)?;"));
        assert!(!out.contains("struct"));
        syn::parse_file(&out).expect("query should parse");
    }

    #[test]
    fn test_flat_one_query_returns_tuple() {
        let query = QueryBuilder::new("postgres", "author_pair")
            .flat()
            .one()
            .sql("SELECT id, name FROM author LIMIT 1")
            .fields(fields())
            .build()
            .expect("Failed to build query");
        let out = render_query(&query).expect("Failed to render");

        assert!(out.contains("-> Result<Option<(i32, String)>, XoError>"));
        assert!(out.contains("Ok((row.get(0)?, row.get(1)?))"));
        syn::parse_file(&out).expect("query should parse");
    }

    #[test]
    fn test_flat_query_without_fields_fails() {
        let query = QueryBuilder::new("postgres", "nothing")
            .flat()
            .sql("SELECT 1")
            .build()
            .expect("Failed to build query");
        assert!(render_query(&query).is_err());
    }

    #[test]
    fn test_interpolated_params_are_formatted() {
        let query = QueryBuilder::new("postgres", "count_rows")
            .flat()
            .sql("SELECT count(*) FROM %%table string,interpolate%% WHERE tags @> '{a}' AND id > %%min bigint%%")
            .fields(vec![Field::new("count", Datatype::new("bigint"))])
            .build()
            .expect("Failed to build query");
        let out = render_query(&query).expect("Failed to render");

        assert!(out.contains("(db: &D, table: &str, min: i64) -> Result<Vec<i64>, XoError>"));
        assert!(out.contains(
            "let sql = format!(\"SELECT count(*) FROM {table} WHERE tags @> '{{a}}' AND id > $1\");"
        ));
        assert!(out.contains("let params = [min.to_value()];"));
        assert!(out.contains("db.query(&sql, &params)?"));
        syn::parse_file(&out).expect("query should parse");
    }
}
