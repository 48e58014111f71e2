//! Stored procedure wrappers.

use super::types::param_type;
use super::{bind_params, doc, fn_ident, ident, literal, locals, placeholders};
use crate::error::RenderError;
use crate::template::{Entity, RenderContext};
use xogen_schema::Proc;

/// Renders the wrapper function of a stored procedure.
///
/// # Errors
/// Returns `RenderError` if the entity is not a procedure.
pub fn render(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::Proc(proc_def) = ctx.entity() else {
        return Err(RenderError::new(format!("proc cannot render {}", ctx.entity())));
    };
    let name = fn_ident(ctx, &proc_def.name);

    let mut scope = locals(ctx);
    let mut params = Vec::with_capacity(proc_def.params.len());
    let mut args = Vec::with_capacity(proc_def.params.len());
    for field in &proc_def.params {
        let ty = ctx.type_of(&field.datatype);
        let arg = if field.name.is_empty() {
            scope.short_name(&ty)
        } else {
            ident(&mut scope, &field.name)
        };
        params.push(format!("{}: {}", arg, param_type(ctx, &ty)));
        args.push(arg);
    }
    let ret = if proc_def.is_void() {
        "()".to_string()
    } else {
        ctx.type_of(&proc_def.return_field.datatype)
    };

    out.push('\n');
    if proc_def.comment.is_empty() {
        doc(out, "", &format!("Calls the '{}' stored procedure.", proc_def.name));
    } else {
        doc(out, "", &proc_def.comment);
    }
    out.push_str(&format!(
        "pub fn {}<D: Db>(db: &D{}) -> Result<{}, XoError> {{\n",
        name,
        params.iter().map(|p| format!(", {}", p)).collect::<String>(),
        ret
    ));
    out.push_str(&format!(
        "    const SQL: &str = {};\n",
        literal(&call_sql(ctx, proc_def))
    ));
    bind_params(out, "    ", &args);
    if proc_def.is_void() {
        out.push_str("    db.exec(SQL, &params)?;\n");
        out.push_str("    Ok(())\n");
    } else {
        out.push_str("    let row = db.query_one(SQL, &params)?.ok_or(XoError::NoRows)?;\n");
        out.push_str("    row.get(0)\n");
    }
    out.push_str("}\n");
    Ok(())
}

/// Returns the statement invoking `proc_def` on the entity's driver.
fn call_sql(ctx: &RenderContext<'_>, proc_def: &Proc) -> String {
    let target = ctx.table_ref(&proc_def.name);
    let marks = placeholders(ctx.driver(), 1, proc_def.params.len()).join(", ");
    match (ctx.driver(), proc_def.is_void()) {
        ("mysql", true) => format!("CALL {}({})", target, marks),
        ("sqlserver" | "mssql", true) if marks.is_empty() => format!("EXEC {}", target),
        ("sqlserver" | "mssql", true) => format!("EXEC {} {}", target, marks),
        ("oracle" | "godror", true) => format!("BEGIN {}({}); END;", target, marks),
        ("oracle" | "godror", false) => format!("SELECT {}({}) FROM dual", target, marks),
        _ => format!("SELECT {}({})", target, marks),
    }
}
