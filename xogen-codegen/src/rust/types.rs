//! SQL to Rust type mapping.

use crate::resolver::{DEFAULT_SHORT_NAMES, TypeResolver};
use crate::template::{Helpers, RenderContext};
use xogen_schema::naming::to_pascal_case;
use xogen_schema::{Datatype, Schema};

/// Rust types the target knows.
pub const KNOWN_TYPES: &[&str] = &[
    "bool", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "String",
    "Vec<u8>",
];

/// Abbreviations of the Rust types.
pub const SHORT_NAMES: &[(&str, &str)] = &[
    ("bool", "b"),
    ("i8", "i"),
    ("i16", "i"),
    ("i32", "i"),
    ("i64", "i"),
    ("u8", "u"),
    ("u16", "u"),
    ("u32", "u"),
    ("u64", "u"),
    ("f32", "f"),
    ("f64", "f"),
    ("String", "s"),
];

/// Rust keywords, strict and reserved.
pub const KEYWORDS: &[&str] = &[
    "_", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Types passed and copied by value.
const COPY_TYPES: &[&str] = &[
    "bool", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128",
    "usize", "f32", "f64", "char",
];

/// Returns the resolver of the rust target.
#[must_use]
pub fn resolver() -> TypeResolver {
    let mut resolver = TypeResolver::new(
        KNOWN_TYPES.iter().copied(),
        DEFAULT_SHORT_NAMES.iter().chain(SHORT_NAMES).copied(),
    );
    resolver.reserve(KEYWORDS.iter().copied());
    resolver
}

/// Maps a column datatype to a Rust type.
///
/// Arrays become `Vec<T>` and nullable columns `Option<T>`.
#[must_use]
pub fn map_type(helpers: &Helpers, datatype: &Datatype, schema: Option<&Schema>) -> String {
    let mut ty = base_type(helpers, datatype, schema);
    if datatype.array {
        ty = format!("Vec<{}>", ty);
    }
    if datatype.nullable {
        ty = format!("Option<{}>", ty);
    }
    ty
}

fn base_type(helpers: &Helpers, datatype: &Datatype, schema: Option<&Schema>) -> String {
    let config = helpers.config();
    let raw = datatype.type_name.trim();

    if let Some(enum_def) = schema.and_then(|s| s.enum_def(raw)) {
        return to_pascal_case(&enum_def.name);
    }
    if helpers.resolver().is_known(raw) {
        return raw.to_string();
    }

    let lower = raw.to_ascii_lowercase();
    let lower = lower.trim_end_matches("[]");
    let name = lower.split('(').next().unwrap_or_default().trim();
    let (name, unsigned) = match name.strip_suffix(" unsigned") {
        Some(name) => (name.trim(), true),
        None => (name, false),
    };

    let fixed = match (name, unsigned) {
        ("bool" | "boolean", _) => "bool",
        ("bit", _) if datatype.prec <= 1 => "bool",
        ("tinyint", false) => "i8",
        ("tinyint", true) => "u8",
        ("smallint" | "int2" | "smallserial", false) => "i16",
        ("smallint", true) => "u16",
        ("int" | "integer" | "int4" | "serial" | "mediumint", false) => {
            return config.int32_type.clone();
        }
        ("int" | "integer" | "mediumint", true) => return config.uint32_type.clone(),
        ("bigint" | "int8" | "bigserial", false) => "i64",
        ("bigint", true) => "u64",
        ("number", _) if datatype.scale == 0 && datatype.prec > 0 => "i64",
        ("real" | "float4", _) => "f32",
        ("float" | "float8" | "double" | "double precision" | "numeric" | "decimal" | "money"
        | "number", _) => "f64",
        ("text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "nchar"
        | "nvarchar" | "ntext" | "varchar2" | "nvarchar2" | "clob" | "nclob" | "citext"
        | "string" | "uuid" | "uniqueidentifier" | "json" | "jsonb" | "xml" | "inet" | "cidr"
        | "macaddr" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set", _) => "String",
        ("bytea" | "blob" | "binary" | "varbinary" | "tinyblob" | "mediumblob" | "longblob"
        | "image" | "raw" | "bit varying" | "varbit", _) => "Vec<u8>",
        ("date" | "time" | "timetz" | "timestamp" | "timestamptz" | "datetime" | "datetime2"
        | "smalldatetime" | "datetimeoffset" | "interval" | "year", _)
        | ("time with time zone" | "time without time zone", _)
        | ("timestamp with time zone" | "timestamp without time zone", _) => {
            return custom_or(config.custom_types_package.as_str(), name, "String");
        }
        _ => "",
    };
    if !fixed.is_empty() {
        return fixed.to_string();
    }

    tracing::debug!("Unknown type '{}', mapping to a custom type", raw);
    custom_or(config.custom_types_package.as_str(), name, "String")
}

fn custom_or(package: &str, name: &str, fallback: &str) -> String {
    if package.is_empty() {
        fallback.to_string()
    } else {
        format!("{}::{}", package, to_pascal_case(name))
    }
}

/// Returns true if values of `ty` are passed and copied by value.
#[must_use]
pub fn is_copy(ctx: &RenderContext<'_>, ty: &str) -> bool {
    COPY_TYPES.contains(&ty)
        || ctx
            .schema()
            .is_some_and(|s| s.enums.iter().any(|e| to_pascal_case(&e.name) == ty))
}

/// Returns true if `ty` is a primitive integer.
#[must_use]
pub fn is_integer(ty: &str) -> bool {
    matches!(
        ty,
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
            | "usize"
    )
}

/// Returns the parameter type used to pass a value of `ty`.
#[must_use]
pub fn param_type(ctx: &RenderContext<'_>, ty: &str) -> String {
    match ty {
        "String" => "&str".to_string(),
        "Vec<u8>" => "&[u8]".to_string(),
        _ if is_copy(ctx, ty) => ty.to_string(),
        _ => format!("&{}", ty),
    }
}

/// Returns the expression passing `expr` of type `ty` as a parameter.
#[must_use]
pub fn arg_expr(ctx: &RenderContext<'_>, ty: &str, expr: &str) -> String {
    if is_copy(ctx, ty) {
        expr.to_string()
    } else {
        format!("&{}", expr)
    }
}
