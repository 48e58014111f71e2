//! The built-in `rust` target.
//!
//! Generates one module per table (struct, lookups by index, foreign key
//! accessors), enum and stored procedure, plus a shared `db` module with the
//! `Db` trait every generated function is written against.

pub mod enums;
pub mod index;
pub mod package;
pub mod post;
pub mod procs;
pub mod queries;
pub mod typedef;
pub mod types;

use crate::config::{CONFLICT, Config, Flag, INT32, UINT32};
use crate::resolver::{NameScope, TypeResolver};
use crate::template::{
    DB, ENUM, FOREIGN_KEY, GenKind, HDR, Helpers, INDEX, PROC, QUERY, RenderContext, TYPEDEF,
    TemplateRef, TemplateSet,
};
use xogen_schema::naming::{to_pascal_case, to_snake_case};
use xogen_schema::query::placeholder;
use xogen_schema::{Field, Table};

/// Registry key of the target.
pub const TARGET: &str = "rust";

/// Extension of generated files.
pub const FILE_EXT: &str = ".xo.rs";

/// Flag key for extra derives on generated structs.
pub const DERIVE: &str = "derive";

/// Local names used inside generated function bodies.
const LOCALS: &[&str] = &["db", "params", "row", "rows", "sql", "v"];

/// Returns the template set of the target.
#[must_use]
pub fn template_set() -> TemplateSet {
    TemplateSet::new(FILE_EXT)
        .template(HDR, package::render_header)
        .template(DB, package::render_db)
        .template(TYPEDEF, typedef::render)
        .template(INDEX, index::render_index)
        .template(FOREIGN_KEY, index::render_foreign_key)
        .template(ENUM, enums::render)
        .template(PROC, procs::render)
        .template(QUERY, queries::render)
        .header(HDR)
        .package_template(DB)
        .funcs(funcs)
        .file_name(file_name)
        .flag(
            Flag::new(INT32, "int32 type")
                .short('i')
                .default_value("i32")
                .placeholder("i32"),
        )
        .flag(
            Flag::new(UINT32, "uint32 type")
                .short('u')
                .default_value("u32")
                .placeholder("u32"),
        )
        .flag(
            Flag::new(CONFLICT, "name conflict suffix")
                .default_value("_val")
                .placeholder("_val"),
        )
        .flag(Flag::new(DERIVE, "extra derives for generated structs").placeholder("<traits>"))
        .post(post::post_process)
        .types(types::resolver())
}

fn funcs(config: &Config, resolver: TypeResolver) -> Helpers {
    Helpers::new(config, resolver).with_type_mapper(types::map_type)
}

fn file_name(kind: GenKind, tpl: &TemplateRef<'_>, _config: &Config) -> String {
    let entity = matches!(tpl.template, TYPEDEF | ENUM | INDEX | FOREIGN_KEY | PROC);
    if (kind == GenKind::Schema && entity) || tpl.name.is_empty() {
        to_snake_case(tpl.type_name)
    } else {
        to_snake_case(tpl.name)
    }
}

/// Returns the module path segment of the file holding `type_name`.
pub(crate) fn module_name(type_name: &str) -> String {
    let name = to_snake_case(type_name);
    if types::KEYWORDS.contains(&name.as_str()) {
        format!("r#{}", name)
    } else {
        name
    }
}

/// Returns a Rust string literal holding `s`.
pub(crate) fn literal(s: &str) -> String {
    format!("{:?}", s)
}

/// Claims a snake_case identifier.
pub(crate) fn ident(scope: &mut NameScope<'_>, name: &str) -> String {
    scope.claim_with(name, |s| {
        let s = to_snake_case(s);
        if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
            format!("c_{}", s)
        } else {
            s
        }
    })
}

/// Returns the type name generated for `name`.
pub(crate) fn type_ident(ctx: &RenderContext<'_>, name: &str) -> String {
    ctx.scope().claim_with(name, |s| {
        let s = to_pascal_case(s);
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            format!("T{}", s)
        } else {
            s
        }
    })
}

/// Returns the function name generated for `name`.
pub(crate) fn fn_ident(ctx: &RenderContext<'_>, name: &str) -> String {
    ident(&mut ctx.scope(), name)
}

/// Starts a scope with the function-local names reserved.
pub(crate) fn locals<'a>(ctx: &RenderContext<'a>) -> NameScope<'a> {
    let mut scope = ctx.scope();
    for name in LOCALS {
        scope.reserve(*name);
    }
    scope
}

/// Writes a doc comment.
pub(crate) fn doc(out: &mut String, indent: &str, text: &str) {
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(&format!("{}///\n", indent));
        } else {
            out.push_str(&format!("{}/// {}\n", indent, line));
        }
    }
}

/// A column with its generated identifier and type.
#[derive(Debug, Clone)]
pub(crate) struct Column<'a> {
    pub field: &'a Field,
    pub ident: String,
    pub ty: String,
}

/// Names the struct fields of a table, in column order.
pub(crate) fn table_columns<'a>(ctx: &RenderContext<'_>, table: &'a Table) -> Vec<Column<'a>> {
    let mut scope = ctx.scope();
    scope.reserve("xo_exists");
    scope.reserve("xo_deleted");
    columns(ctx, &mut scope, &table.columns)
}

/// Names `fields` within `scope`.
pub(crate) fn columns<'a>(
    ctx: &RenderContext<'_>,
    scope: &mut NameScope<'_>,
    fields: &'a [Field],
) -> Vec<Column<'a>> {
    fields
        .iter()
        .map(|field| Column {
            field,
            ident: ident(scope, &field.name),
            ty: ctx.type_of(&field.datatype),
        })
        .collect()
}

/// Returns `n` placeholders for `driver` starting at position `start`.
pub(crate) fn placeholders(driver: &str, start: usize, n: usize) -> Vec<String> {
    (start..start + n).map(|i| placeholder(driver, i)).collect()
}

/// Returns the `SELECT` of every column of `table`.
pub(crate) fn select_sql(ctx: &RenderContext<'_>, table: &Table) -> String {
    let cols: Vec<String> = table.columns.iter().map(|c| ctx.column(&c.name)).collect();
    format!("SELECT {} FROM {}", cols.join(", "), ctx.table_ref(&table.name))
}

/// Returns `a = $1 AND b = $2` over `fields`, numbering from `start`.
pub(crate) fn where_sql(ctx: &RenderContext<'_>, fields: &[&Field], start: usize) -> String {
    let marks = placeholders(ctx.driver(), start, fields.len());
    fields
        .iter()
        .zip(marks)
        .map(|(f, p)| format!("{} = {}", ctx.column(&f.name), p))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Writes `let params = [..];` binding `exprs`.
pub(crate) fn bind_params(out: &mut String, indent: &str, exprs: &[String]) {
    if exprs.is_empty() {
        out.push_str(&format!("{}let params: [Value; 0] = [];\n", indent));
    } else {
        let values: Vec<String> = exprs.iter().map(|e| format!("{}.to_value()", e)).collect();
        out.push_str(&format!("{}let params = [{}];\n", indent, values.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Entity;
    use xogen_schema::{Datatype, TableKind, Xo};

    #[test]
    fn test_file_names() {
        let config = Config::default();
        let typedef = TemplateRef {
            template: TYPEDEF,
            type_name: "UserAccount",
            name: "UserAccount",
        };
        assert_eq!(file_name(GenKind::Schema, &typedef, &config), "user_account");
        let query = TemplateRef {
            template: QUERY,
            type_name: "AuthorsByName",
            name: "authorsByName",
        };
        assert_eq!(file_name(GenKind::Query, &query, &config), "authors_by_name");
    }

    #[test]
    fn test_identifiers_avoid_keywords() {
        let set = template_set();
        let helpers = funcs(&Config::default(), set.resolver.clone());
        let mut scope = helpers.resolver().scope();
        assert_eq!(ident(&mut scope, "type"), "type_val");
        assert_eq!(ident(&mut scope, "2fa"), "c_2fa");
        assert_eq!(module_name("match"), "r#match");
        assert_eq!(literal("a \"b\"\n"), "\"a \\\"b\\\"\\n\"");
    }

    #[test]
    fn test_type_ident() {
        let set = template_set();
        let helpers = funcs(&Config::default(), set.resolver.clone());
        let xo = Xo::new();
        let table = Table::new(TableKind::Table, "self");
        let ctx = RenderContext::new(Entity::Table(&table), &xo, &helpers);
        assert_eq!(type_ident(&ctx, "user_account"), "UserAccount");
        assert_eq!(type_ident(&ctx, "self"), "SelfVal");
    }

    #[test]
    fn test_where_sql_numbering() {
        let set = template_set();
        let helpers = funcs(&Config::default(), set.resolver.clone());
        let xo = Xo::new();
        let table = Table::new(TableKind::Table, "t");
        let ctx = RenderContext::new(Entity::Table(&table), &xo, &helpers);
        let a = Field::new("a", Datatype::new("int"));
        let b = Field::new("b", Datatype::new("int"));
        assert_eq!(where_sql(&ctx, &[&a, &b], 3), "a = ? AND b = ?");
    }
}
