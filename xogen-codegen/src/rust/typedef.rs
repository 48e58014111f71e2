//! Structs for tables and views.

use super::{
    Column, DERIVE, bind_params, doc, literal, placeholders, select_sql, table_columns,
    type_ident, where_sql,
};
use crate::error::RenderError;
use crate::template::{Entity, RenderContext};
use xogen_schema::{Field, Table};

const BASE_DERIVES: &[&str] = &["Debug", "Clone", "PartialEq"];

/// Renders the struct of a table or view.
///
/// # Errors
/// Returns `RenderError` if the entity is not a table.
pub fn render(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::Table(table) = ctx.entity() else {
        return Err(RenderError::new(format!("typedef cannot render {}", ctx.entity())));
    };
    let name = type_ident(ctx, &table.name);
    let cols = table_columns(ctx, table);
    let sql = Statements::new(ctx, table);

    if table.comment.is_empty() {
        doc(
            out,
            "",
            &format!("Represents a row from '{}'.", ctx.table_ref(&table.name)),
        );
    } else {
        doc(out, "", &table.comment);
    }
    out.push_str(&format!("#[derive({})]\n", derives(ctx, &cols).join(", ")));
    out.push_str(&format!("pub struct {} {{\n", name));
    for col in &cols {
        if !col.field.comment.is_empty() {
            doc(out, "    ", &col.field.comment);
        }
        out.push_str(&format!("    pub {}: {},\n", col.ident, col.ty));
    }
    if !table.is_view() {
        out.push_str("    pub(crate) xo_exists: bool,\n");
        out.push_str("    pub(crate) xo_deleted: bool,\n");
    }
    out.push_str("}\n\n");

    out.push_str(&format!("impl {} {{\n", name));
    sql.render_consts(ctx, table, out);
    render_from_row(table, &cols, out);
    if !table.is_view() {
        render_state(out);
        render_insert(&cols, sql.returning, out);
        if sql.update.is_some() {
            render_update(&cols, out);
            render_save(out);
        }
        if sql.delete.is_some() {
            render_delete(&cols, out);
        }
    }
    out.push_str("}\n");
    Ok(())
}

fn derives(ctx: &RenderContext<'_>, cols: &[Column<'_>]) -> Vec<String> {
    let mut derives: Vec<String> = BASE_DERIVES.iter().map(ToString::to_string).collect();
    if cols.iter().all(|c| has_default(ctx, c.field)) {
        derives.push("Default".to_string());
    }
    if let Some(extra) = ctx.config().extra.get(DERIVE) {
        for derive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            if !derives.iter().any(|d| d == derive) {
                derives.push(derive.to_string());
            }
        }
    }
    derives
}

/// An enum without values has no default.
fn has_default(ctx: &RenderContext<'_>, field: &Field) -> bool {
    let datatype = &field.datatype;
    if datatype.nullable || datatype.array {
        return true;
    }
    !ctx.schema()
        .and_then(|s| s.enum_def(&datatype.type_name))
        .is_some_and(|e| e.values.is_empty())
}

/// SQL statements of one table.
struct Statements {
    select: String,
    insert: Option<String>,
    update: Option<String>,
    delete: Option<String>,
    /// Whether the insert returns the sequence columns.
    returning: bool,
}

impl Statements {
    fn new(ctx: &RenderContext<'_>, table: &Table) -> Self {
        let select = select_sql(ctx, table);
        if table.is_view() {
            return Self {
                select,
                insert: None,
                update: None,
                delete: None,
                returning: false,
            };
        }

        let driver = ctx.driver();
        let target = ctx.table_ref(&table.name);
        let insertable: Vec<&Field> = table.insertable_columns().collect();
        let sequences: Vec<String> = table
            .columns
            .iter()
            .filter(|c| c.is_sequence)
            .map(|c| ctx.column(&c.name))
            .collect();
        let returning = !sequences.is_empty() && matches!(driver, "postgres" | "sqlserver");

        let output = if returning && driver == "sqlserver" {
            let inserted: Vec<String> = sequences.iter().map(|c| format!("INSERTED.{}", c)).collect();
            format!(" OUTPUT {}", inserted.join(", "))
        } else {
            String::new()
        };
        let mut insert = if insertable.is_empty() {
            if driver == "mysql" {
                format!("INSERT INTO {} () VALUES ()", target)
            } else {
                format!("INSERT INTO {}{} DEFAULT VALUES", target, output)
            }
        } else {
            let names: Vec<String> = insertable.iter().map(|c| ctx.column(&c.name)).collect();
            format!(
                "INSERT INTO {} ({}){} VALUES ({})",
                target,
                names.join(", "),
                output,
                placeholders(driver, 1, insertable.len()).join(", ")
            )
        };
        if returning && driver == "postgres" {
            insert.push_str(&format!(" RETURNING {}", sequences.join(", ")));
        }

        let keys: Vec<&Field> = table.columns.iter().filter(|c| c.is_primary).collect();
        let non_keys: Vec<&Field> = table.non_key_columns().collect();
        let update = (!keys.is_empty() && !non_keys.is_empty()).then(|| {
            let marks = placeholders(driver, 1, non_keys.len());
            let sets: Vec<String> = non_keys
                .iter()
                .zip(marks)
                .map(|(c, p)| format!("{} = {}", ctx.column(&c.name), p))
                .collect();
            format!(
                "UPDATE {} SET {} WHERE {}",
                target,
                sets.join(", "),
                where_sql(ctx, &keys, non_keys.len() + 1)
            )
        });
        let delete = (!keys.is_empty())
            .then(|| format!("DELETE FROM {} WHERE {}", target, where_sql(ctx, &keys, 1)));

        Self {
            select,
            insert: Some(insert),
            update,
            delete,
            returning,
        }
    }

    fn render_consts(&self, ctx: &RenderContext<'_>, table: &Table, out: &mut String) {
        out.push_str("    /// Qualified table name.\n");
        out.push_str(&format!(
            "    pub const TABLE: &'static str = {};\n",
            literal(&ctx.table_ref(&table.name))
        ));
        let names: Vec<String> = table.columns.iter().map(|c| literal(&c.name)).collect();
        out.push_str("    /// Column names, in field order.\n");
        out.push_str(&format!(
            "    pub const COLUMNS: &'static [&'static str] = &[{}];\n",
            names.join(", ")
        ));
        out.push_str("    /// Selects every column.\n");
        out.push_str(&format!(
            "    pub const SELECT: &'static str = {};\n",
            literal(&self.select)
        ));
        let statements = [
            ("INSERT", &self.insert),
            ("UPDATE", &self.update),
            ("DELETE", &self.delete),
        ];
        for (name, sql) in statements {
            if let Some(sql) = sql {
                out.push_str(&format!(
                    "    const {}: &'static str = {};\n",
                    name,
                    literal(sql)
                ));
            }
        }
        out.push('\n');
    }
}

fn render_from_row(table: &Table, cols: &[Column<'_>], out: &mut String) {
    let row = if cols.is_empty() { "_row" } else { "row" };
    out.push_str("    /// Decodes a row selected with [`Self::SELECT`].\n");
    out.push_str(&format!(
        "    pub fn from_row<R: Row>({}: &R) -> Result<Self, XoError> {{\n",
        row
    ));
    out.push_str("        Ok(Self {\n");
    for (i, col) in cols.iter().enumerate() {
        out.push_str(&format!("            {}: row.get({})?,\n", col.ident, i));
    }
    if !table.is_view() {
        out.push_str("            xo_exists: true,\n");
        out.push_str("            xo_deleted: false,\n");
    }
    out.push_str("        })\n");
    out.push_str("    }\n");
}

fn render_state(out: &mut String) {
    out.push_str(
        r"
    /// Returns true if the row exists in the database.
    pub fn exists(&self) -> bool {
        self.xo_exists
    }

    /// Returns true if the row has been deleted.
    pub fn deleted(&self) -> bool {
        self.xo_deleted
    }
",
    );
}

fn render_insert(cols: &[Column<'_>], returning: bool, out: &mut String) {
    let params: Vec<String> = cols
        .iter()
        .filter(|c| !c.field.is_sequence)
        .map(|c| format!("self.{}", c.ident))
        .collect();
    let sequences: Vec<&Column<'_>> = cols.iter().filter(|c| c.field.is_sequence).collect();

    out.push_str("\n    /// Inserts the row.\n");
    out.push_str("    pub fn insert<D: Db>(&mut self, db: &D) -> Result<(), XoError> {\n");
    out.push_str("        if self.xo_exists {\n");
    out.push_str("            return Err(XoError::AlreadyExists);\n");
    out.push_str("        }\n");
    out.push_str("        if self.xo_deleted {\n");
    out.push_str("            return Err(XoError::MarkedForDeletion);\n");
    out.push_str("        }\n");
    bind_params(out, "        ", &params);
    match sequences.first() {
        Some(_) if returning => {
            out.push_str(
                "        let row = db.query_one(Self::INSERT, &params)?.ok_or(XoError::NoRows)?;\n",
            );
            for (i, col) in sequences.iter().enumerate() {
                out.push_str(&format!("        self.{} = row.get({})?;\n", col.ident, i));
            }
        }
        Some(col) => {
            out.push_str("        db.exec(Self::INSERT, &params)?;\n");
            out.push_str(&format!(
                "        self.{} = FromValue::from_value(Value::Int(db.last_insert_id()?))?;\n",
                col.ident
            ));
        }
        None => out.push_str("        db.exec(Self::INSERT, &params)?;\n"),
    }
    out.push_str("        self.xo_exists = true;\n");
    out.push_str("        Ok(())\n");
    out.push_str("    }\n");
}

fn render_update(cols: &[Column<'_>], out: &mut String) {
    let params: Vec<String> = cols
        .iter()
        .filter(|c| !c.field.is_primary)
        .chain(cols.iter().filter(|c| c.field.is_primary))
        .map(|c| format!("self.{}", c.ident))
        .collect();

    out.push_str("\n    /// Updates the row.\n");
    out.push_str("    pub fn update<D: Db>(&self, db: &D) -> Result<(), XoError> {\n");
    out.push_str("        if !self.xo_exists {\n");
    out.push_str("            return Err(XoError::DoesNotExist);\n");
    out.push_str("        }\n");
    out.push_str("        if self.xo_deleted {\n");
    out.push_str("            return Err(XoError::MarkedForDeletion);\n");
    out.push_str("        }\n");
    bind_params(out, "        ", &params);
    out.push_str("        db.exec(Self::UPDATE, &params)?;\n");
    out.push_str("        Ok(())\n");
    out.push_str("    }\n");
}

fn render_save(out: &mut String) {
    out.push_str(
        r"
    /// Inserts the row, or updates it if it exists.
    pub fn save<D: Db>(&mut self, db: &D) -> Result<(), XoError> {
        if self.xo_exists {
            self.update(db)
        } else {
            self.insert(db)
        }
    }
",
    );
}

fn render_delete(cols: &[Column<'_>], out: &mut String) {
    let params: Vec<String> = cols
        .iter()
        .filter(|c| c.field.is_primary)
        .map(|c| format!("self.{}", c.ident))
        .collect();

    out.push_str("\n    /// Deletes the row.\n");
    out.push_str("    pub fn delete<D: Db>(&mut self, db: &D) -> Result<(), XoError> {\n");
    out.push_str("        if !self.xo_exists || self.xo_deleted {\n");
    out.push_str("            return Ok(());\n");
    out.push_str("        }\n");
    bind_params(out, "        ", &params);
    out.push_str("        db.exec(Self::DELETE, &params)?;\n");
    out.push_str("        self.xo_deleted = true;\n");
    out.push_str("        Ok(())\n");
    out.push_str("    }\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rust::template_set;
    use crate::template::Helpers;
    use xogen_schema::{Datatype, Enum, Schema, TableKind, Xo};

    fn helpers(config: &Config) -> Helpers {
        let set = template_set();
        (set.funcs)(config, set.resolver.clone())
    }

    fn rust_config() -> Config {
        Config {
            int32_type: "i32".to_string(),
            uint32_type: "u32".to_string(),
            conflict_suffix: "_val".to_string(),
            ..Config::default()
        }
    }

    fn user() -> Table {
        let mut table = Table::new(TableKind::Table, "user");
        table.columns = vec![
            Field::new("id", Datatype::new("integer")).primary().sequence(),
            Field::new("name", Datatype::new("text")),
            Field::new("email", Datatype::new("text").nullable()),
        ];
        table.primary_keys = vec![table.columns[0].clone()];
        table
    }

    fn render_table(schema: &Schema, table: &Table, config: &Config) -> String {
        let helpers = helpers(config);
        let xo = Xo::new();
        let ctx = RenderContext::new(Entity::Table(table), &xo, &helpers).in_schema(schema);
        let mut out = String::new();
        render(&ctx, &mut out).expect("Failed to render");
        out
    }

    #[test]
    fn test_postgres_table_returns_sequence() {
        let schema = Schema::new("postgres", "public");
        let out = render_table(&schema, &user(), &rust_config());

        assert!(out.contains("pub struct User {"));
        assert!(out.contains("pub email: Option<String>,"));
        assert!(out.contains("#[derive(Debug, Clone, PartialEq, Default)]"));
        assert!(out.contains(
            "\"INSERT INTO public.user (name, email) VALUES ($1, $2) RETURNING id\""
        ));
        assert!(out.contains("\"UPDATE public.user SET name = $1, email = $2 WHERE id = $3\""));
        assert!(out.contains("\"DELETE FROM public.user WHERE id = $1\""));
        assert!(out.contains("self.id = row.get(0)?;"));
        assert!(out.contains("pub fn save<D: Db>"));
        syn::parse_file(&out).expect("typedef should parse");
    }

    #[test]
    fn test_sqlite_table_uses_last_insert_id() {
        let schema = Schema::new("sqlite3", "main");
        let out = render_table(&schema, &user(), &rust_config());

        assert!(out.contains("\"INSERT INTO user (name, email) VALUES (?, ?)\""));
        assert!(out.contains("db.last_insert_id()"));
        syn::parse_file(&out).expect("typedef should parse");
    }

    #[test]
    fn test_sqlserver_insert_outputs_sequence() {
        let schema = Schema::new("sqlserver", "dbo");
        let out = render_table(&schema, &user(), &rust_config());
        assert!(out.contains(
            "\"INSERT INTO dbo.user (name, email) OUTPUT INSERTED.id VALUES (@p1, @p2)\""
        ));
    }

    #[test]
    fn test_view_has_no_mutations() {
        let schema = Schema::new("postgres", "public");
        let mut view = user();
        view.kind = TableKind::View;
        view.name = "active_user".to_string();
        let out = render_table(&schema, &view, &rust_config());

        assert!(out.contains("pub struct ActiveUser {"));
        assert!(out.contains("pub fn from_row"));
        assert!(!out.contains("xo_exists"));
        assert!(!out.contains("fn insert"));
        syn::parse_file(&out).expect("view should parse");
    }

    #[test]
    fn test_table_without_key_or_columns() {
        let schema = Schema::new("mysql", "app");
        let table = Table::new(TableKind::Table, "ping");
        let out = render_table(&schema, &table, &rust_config());

        assert!(out.contains("\"INSERT INTO app.ping () VALUES ()\""));
        assert!(out.contains("pub fn from_row<R: Row>(_row: &R)"));
        assert!(out.contains("let params: [Value; 0] = [];"));
        assert!(!out.contains("fn update"));
        assert!(!out.contains("fn delete"));
        syn::parse_file(&out).expect("typedef should parse");
    }

    #[test]
    fn test_extra_derives_and_empty_enum() {
        let mut schema = Schema::new("postgres", "public");
        schema.enums.push(Enum {
            name: "nothing".to_string(),
            ..Enum::default()
        });
        let mut table = user();
        table.columns.push(Field::new("state", Datatype::new("nothing")));
        let mut config = rust_config();
        config.extra.insert(DERIVE.to_string(), "Eq, Debug,Hash".to_string());
        let out = render_table(&schema, &table, &config);

        assert!(out.contains("#[derive(Debug, Clone, PartialEq, Eq, Hash)]"));
        assert!(out.contains("pub state: Nothing,"));
    }

    #[test]
    fn test_keyword_columns_are_renamed() {
        let schema = Schema::new("postgres", "public");
        let mut table = Table::new(TableKind::Table, "item");
        table.columns = vec![
            Field::new("id", Datatype::new("bigint")).primary(),
            Field::new("type", Datatype::new("text")),
        ];
        let out = render_table(&schema, &table, &rust_config());

        assert!(out.contains("pub type_val: String,"));
        assert!(out.contains("\"UPDATE public.item SET type = $1 WHERE id = $2\""));
        syn::parse_file(&out).expect("typedef should parse");
    }
}
