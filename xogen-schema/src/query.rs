//! Hand-written query definitions.
//!
//! Queries are not introspected; they are written by the user with
//! `%%name type%%` placeholders and turned into a [`Query`] whose parameters
//! become typed bindings in the generated code.

use crate::error::QueryError;
use crate::types::{Datatype, Field};
use serde::{Deserialize, Serialize};

/// A hand-written query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Driver identifier.
    pub driver: String,
    /// Query (function) name.
    pub name: String,
    /// Comment.
    pub comment: String,
    /// Executes without returning rows.
    pub exec: bool,
    /// Returns flat values instead of a result type.
    pub flat: bool,
    /// Returns a single row.
    pub one: bool,
    /// Contains interpolated parameters.
    pub interpolate: bool,
    /// Result type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Result type comment.
    pub type_comment: String,
    /// Result columns.
    pub fields: Vec<Field>,
    /// Result columns were supplied by the user.
    pub manual_fields: bool,
    /// Parameters, in binding order.
    pub params: Vec<Field>,
    /// SQL text lines, placeholders already substituted.
    pub query: Vec<String>,
    /// Leading SQL comments.
    pub comments: Vec<String>,
}

impl Query {
    /// Returns the SQL text joined into one statement.
    #[must_use]
    pub fn sql(&self) -> String {
        self.query.join("\n")
    }

    /// Bound (non-interpolated) parameters.
    pub fn bound_params(&self) -> impl Iterator<Item = &Field> {
        self.params.iter().filter(|p| !p.interpolate)
    }
}

/// Returns the positional parameter placeholder for `driver`.
///
/// `n` is 1-based.
#[must_use]
pub fn placeholder(driver: &str, n: usize) -> String {
    match driver {
        "postgres" | "pgx" => format!("${n}"),
        "sqlserver" | "mssql" => format!("@p{n}"),
        "oracle" | "godror" => format!(":{n}"),
        _ => "?".to_string(),
    }
}

fn numbered(driver: &str) -> bool {
    placeholder(driver, 1) != "?"
}

/// Builds a [`Query`] from SQL text.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
    sql: String,
}

impl QueryBuilder {
    /// Starts a query named `name` for `driver`.
    #[must_use]
    pub fn new(driver: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            query: Query {
                driver: driver.into(),
                name: name.into(),
                ..Query::default()
            },
            sql: String::new(),
        }
    }

    /// Sets the SQL text.
    #[must_use]
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    /// Sets the query comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.query.comment = comment.into();
        self
    }

    /// Marks the query as exec-only.
    #[must_use]
    pub fn exec(mut self) -> Self {
        self.query.exec = true;
        self
    }

    /// Marks the query as returning flat values.
    #[must_use]
    pub fn flat(mut self) -> Self {
        self.query.flat = true;
        self
    }

    /// Marks the query as returning one row.
    #[must_use]
    pub fn one(mut self) -> Self {
        self.query.one = true;
        self
    }

    /// Sets the result type name and comment.
    #[must_use]
    pub fn result_type(mut self, name: impl Into<String>, comment: impl Into<String>) -> Self {
        self.query.type_name = name.into();
        self.query.type_comment = comment.into();
        self
    }

    /// Supplies the result columns by hand.
    #[must_use]
    pub fn fields(mut self, fields: Vec<Field>) -> Self {
        self.query.fields = fields;
        self.query.manual_fields = true;
        self
    }

    /// Parses the SQL text and returns the finished query.
    ///
    /// # Errors
    /// Returns `QueryError` for empty SQL or malformed placeholders.
    pub fn build(self) -> Result<Query, QueryError> {
        let Self { mut query, sql } = self;
        let numbered = numbered(&query.driver);
        let mut in_header = true;

        for (i, raw) in sql.lines().enumerate() {
            let line = raw.trim_end();
            if in_header {
                let trimmed = line.trim_start();
                if let Some(comment) = trimmed.strip_prefix("--") {
                    query.comments.push(comment.trim().to_string());
                    continue;
                }
                if trimmed.is_empty() {
                    continue;
                }
                in_header = false;
            }
            let text = substitute(&mut query, line, i + 1, numbered)?;
            query.query.push(text);
        }

        while query.query.last().is_some_and(|l| l.trim().is_empty()) {
            query.query.pop();
        }
        if query.query.is_empty() {
            return Err(QueryError::Empty { query: query.name });
        }
        query.interpolate = query.params.iter().any(|p| p.interpolate);
        if query.type_name.is_empty() && !query.exec && !query.flat {
            query.type_name = crate::naming::to_pascal_case(&query.name);
        }
        Ok(query)
    }
}

/// Replaces every placeholder in `line`, recording parameters on `query`.
fn substitute(
    query: &mut Query,
    line: &str,
    line_no: usize,
    numbered: bool,
) -> Result<String, QueryError> {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find("%%") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("%%") else {
            return Err(QueryError::Unterminated {
                query: query.name.clone(),
                line: line_no,
            });
        };
        let param = parse_placeholder(&query.name, &after[..end])?;

        if param.interpolate {
            out.push('{');
            out.push_str(&param.name);
            out.push('}');
            if !query.params.iter().any(|p| p.name == param.name) {
                query.params.push(param);
            }
        } else if numbered {
            let bound = query.params.iter().filter(|p| !p.interpolate);
            let position = bound.clone().position(|p| p.name == param.name);
            let n = match position {
                Some(pos) => pos + 1,
                None => {
                    let n = bound.count() + 1;
                    query.params.push(param);
                    n
                }
            };
            out.push_str(&placeholder(&query.driver, n));
        } else {
            query.params.push(param);
            out.push('?');
        }

        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn parse_placeholder(query: &str, body: &str) -> Result<Field, QueryError> {
    let malformed = || QueryError::Malformed {
        query: query.to_string(),
        placeholder: body.to_string(),
    };

    let (spec, options) = match body.split_once(',') {
        Some((spec, options)) => (spec, Some(options.trim())),
        None => (body, None),
    };
    let mut parts = spec.trim().splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty()).ok_or_else(malformed)?;
    let type_name = parts
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(malformed)?;

    let mut field = Field::new(name, Datatype::new(type_name));
    match options {
        None => {}
        Some("interpolate") => field.interpolate = true,
        Some(_) => return Err(malformed()),
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_styles() {
        assert_eq!(placeholder("postgres", 2), "$2");
        assert_eq!(placeholder("sqlserver", 1), "@p1");
        assert_eq!(placeholder("oracle", 3), ":3");
        assert_eq!(placeholder("mysql", 3), "?");
        assert_eq!(placeholder("sqlite3", 1), "?");
    }

    #[test]
    fn test_build_postgres_query() {
        let query = QueryBuilder::new("postgres", "authors_by_name")
            .sql(
                "-- find authors\n\
                 SELECT id, name FROM author\n\
                 WHERE name = %%name text%% OR alias = %%name text%%\n\
                 LIMIT %%limit integer%%",
            )
            .build()
            .expect("Failed to parse query");

        assert_eq!(query.comments, ["find authors"]);
        assert_eq!(
            query.query[1],
            "WHERE name = $1 OR alias = $1"
        );
        assert_eq!(query.query[2], "LIMIT $2");
        let names: Vec<_> = query.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["name", "limit"]);
        assert_eq!(query.params[1].datatype.type_name, "integer");
        assert_eq!(query.type_name, "AuthorsByName");
        assert!(!query.interpolate);
    }

    #[test]
    fn test_build_positional_driver_repeats_params() {
        let query = QueryBuilder::new("mysql", "touch")
            .exec()
            .sql("UPDATE t SET a = %%v int%% WHERE b = %%v int%%")
            .build()
            .expect("Failed to parse query");

        assert_eq!(query.sql(), "UPDATE t SET a = ? WHERE b = ?");
        assert_eq!(query.params.len(), 2);
        assert!(query.type_name.is_empty());
    }

    #[test]
    fn test_build_interpolated_param() {
        let query = QueryBuilder::new("postgres", "count_rows")
            .flat()
            .sql("SELECT count(*) FROM %%table string,interpolate%% WHERE id > %%min bigint%%")
            .build()
            .expect("Failed to parse query");

        assert_eq!(query.sql(), "SELECT count(*) FROM {table} WHERE id > $1");
        assert!(query.interpolate);
        assert_eq!(query.bound_params().count(), 1);
    }

    #[test]
    fn test_build_multi_word_type() {
        let query = QueryBuilder::new("postgres", "q")
            .sql("SELECT %%label character varying%%")
            .build()
            .expect("Failed to parse query");
        assert_eq!(query.params[0].datatype.type_name, "character varying");
    }

    #[test]
    fn test_build_unterminated_placeholder() {
        let err = QueryBuilder::new("postgres", "broken")
            .sql("SELECT 1\nWHERE a = %%a int")
            .build()
            .expect_err("should fail");
        assert_eq!(
            err,
            QueryError::Unterminated {
                query: "broken".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn test_build_malformed_placeholder() {
        let err = QueryBuilder::new("postgres", "broken")
            .sql("SELECT %%a%%")
            .build()
            .expect_err("should fail");
        assert!(matches!(err, QueryError::Malformed { .. }));
    }

    #[test]
    fn test_build_empty_query() {
        let err = QueryBuilder::new("postgres", "nothing")
            .sql("-- only a comment\n")
            .build()
            .expect_err("should fail");
        assert!(matches!(err, QueryError::Empty { .. }));
    }
}
