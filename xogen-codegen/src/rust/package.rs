//! File header and the shared `db` module.

use super::{module_name, type_ident};
use crate::error::RenderError;
use crate::template::{DB, RenderContext};

/// Renders the header of one generated file.
///
/// # Errors
/// Never fails; the signature matches the template contract.
pub fn render_header(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let config = ctx.config();
    out.push_str("// Code generated by xogen. DO NOT EDIT.\n");
    if !config.build_tags.is_empty() {
        out.push_str(&format!("#![cfg({})]\n", config.build_tags));
    }
    if ctx.is_first() && !config.not_first {
        let schema = ctx
            .schema()
            .or_else(|| ctx.xo().schemas.first())
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        let package = config.package_or(if schema.is_empty() { "models" } else { schema });
        if schema.is_empty() {
            out.push_str(&format!("//! Package `{}` contains generated database code.\n", package));
        } else {
            out.push_str(&format!(
                "//! Package `{}` contains the generated database code for schema '{}'.\n",
                package, schema
            ));
        }
    }
    out.push('\n');

    if ctx.file() == DB {
        return Ok(());
    }
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use super::db::{Db, FromValue, Row, ToValue, Value, XoError};\n");
    for schema in &ctx.xo().schemas {
        for enum_def in &schema.enums {
            let module = module_name(&enum_def.name);
            if module == ctx.file() {
                continue;
            }
            out.push_str("#[allow(unused_imports)]\n");
            out.push_str(&format!(
                "use super::{}::{};\n",
                module,
                type_ident(ctx, &enum_def.name)
            ));
        }
    }
    out.push('\n');
    Ok(())
}

/// Renders the shared `db` module.
///
/// # Errors
/// Never fails; the signature matches the template contract.
pub fn render_db(_ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    out.push_str(DB_SOURCE);
    Ok(())
}

const DB_SOURCE: &str = r#"use std::fmt;

/// Error returned by generated code.
#[derive(Debug)]
pub enum XoError {
    /// Error reported by the database driver.
    Db(Box<dyn std::error::Error + Send + Sync>),
    /// A column value could not be decoded.
    Decode(String),
    /// Insert of a row that already exists.
    AlreadyExists,
    /// Update or delete of a row that does not exist.
    DoesNotExist,
    /// Operation on a row marked for deletion.
    MarkedForDeletion,
    /// A query expected a row and returned none.
    NoRows,
}

impl fmt::Display for XoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database error: {}", err),
            Self::Decode(msg) => write!(f, "decode error: {}", msg),
            Self::AlreadyExists => f.write_str("insert failed: already exists"),
            Self::DoesNotExist => f.write_str("row does not exist"),
            Self::MarkedForDeletion => f.write_str("row is marked for deletion"),
            Self::NoRows => f.write_str("no rows in result set"),
        }
    }
}

impl std::error::Error for XoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Db(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A bound parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Array.
    Array(Vec<Value>),
}

/// Conversion into a bound parameter.
pub trait ToValue {
    /// Converts `self` into a parameter value.
    fn to_value(&self) -> Value;
}

/// Conversion from a column value.
pub trait FromValue: Sized {
    /// Decodes a column value.
    fn from_value(value: Value) -> Result<Self, XoError>;
}

/// A result row.
pub trait Row {
    /// Returns the value of the column at `idx`.
    fn value(&self, idx: usize) -> Result<Value, XoError>;

    /// Decodes the column at `idx`.
    fn get<T: FromValue>(&self, idx: usize) -> Result<T, XoError> {
        T::from_value(self.value(idx)?)
    }
}

/// Connection the generated code runs against.
pub trait Db {
    /// Row type returned by queries.
    type Row: Row;

    /// Executes a statement and returns the number of affected rows.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, XoError>;

    /// Runs a query and returns every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Self::Row>, XoError>;

    /// Runs a query and returns its first row.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Self::Row>, XoError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Returns the id generated by the last insert.
    fn last_insert_id(&self) -> Result<i64, XoError>;
}

fn decode_error(expected: &str, value: &Value) -> XoError {
    XoError::Decode(format!("expected {}, got {:?}", expected, value))
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, XoError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, XoError> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            other => Err(decode_error("bool", &other)),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, XoError> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(decode_error("text", &other)),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, XoError> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(decode_error("bytes", &other)),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, XoError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, XoError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(decode_error("float", &other)),
        }
    }
}

macro_rules! int_values {
    ($($ty:ty),*) => {$(
        impl ToValue for $ty {
            #[allow(clippy::cast_possible_wrap, clippy::unnecessary_cast)]
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, XoError> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| {
                        XoError::Decode(format!("{} out of range for {}", v, stringify!($ty)))
                    }),
                    other => Err(decode_error("integer", &other)),
                }
            }
        }
    )*};
}

int_values!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! array_values {
    ($($ty:ty),*) => {$(
        impl ToValue for Vec<$ty> {
            fn to_value(&self) -> Value {
                Value::Array(self.iter().map(ToValue::to_value).collect())
            }
        }

        impl FromValue for Vec<$ty> {
            fn from_value(value: Value) -> Result<Self, XoError> {
                match value {
                    Value::Array(values) => values.into_iter().map(<$ty>::from_value).collect(),
                    other => Err(decode_error("array", &other)),
                }
            }
        }
    )*};
}

array_values!(bool, i16, i32, i64, f32, f64, String);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_source_parses() {
        syn::parse_file(DB_SOURCE).expect("db module should parse");
    }
}
