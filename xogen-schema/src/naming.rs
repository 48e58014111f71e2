//! Identifier case conversion shared by the IR builder and the templates.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Converts a string to snake_case.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    s.to_snake_case()
}

/// Converts a string to PascalCase.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Derives the lookup function name for an index over `fields` of `table`.
#[must_use]
pub fn index_func_name<'a>(table: &str, fields: impl IntoIterator<Item = &'a str>) -> String {
    let cols: Vec<String> = fields.into_iter().map(to_snake_case).collect();
    format!("{}_by_{}", to_snake_case(table), cols.join("_"))
}

/// Strips a trailing `_id` / `id` from a column name.
#[must_use]
pub fn strip_id_suffix(column: &str) -> &str {
    let lower = column.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("_id") {
        &column[..column.len() - 3]
    } else if lower.len() > 2 && lower.ends_with("id") {
        &column[..column.len() - 2]
    } else {
        column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("contentTypeId"), "content_type_id");
        assert_eq!(to_snake_case("symbol"), "symbol");
        assert_eq!(to_snake_case("typeVal"), "type_val");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("auth_permission"), "AuthPermission");
        assert_eq!(to_pascal_case("side"), "Side");
        assert_eq!(to_pascal_case("order-type"), "OrderType");
    }

    #[test]
    fn test_index_func_name() {
        assert_eq!(index_func_name("user", ["id"]), "user_by_id");
        assert_eq!(
            index_func_name("auth_permission", ["content_type_id", "codename"]),
            "auth_permission_by_content_type_id_codename"
        );
    }

    #[test]
    fn test_strip_id_suffix() {
        assert_eq!(strip_id_suffix("author_id"), "author");
        assert_eq!(strip_id_suffix("authorID"), "author");
        assert_eq!(strip_id_suffix("id"), "id");
        assert_eq!(strip_id_suffix("name"), "name");
    }
}
