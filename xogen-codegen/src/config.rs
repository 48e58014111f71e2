//! Generation run configuration.
//!
//! A template set declares its [`Flag`]s; raw values collected by a CLI or
//! config layer arrive as [`FlagValues`] and are resolved into a typed
//! [`Config`] before any schema is built.

use crate::error::CodegenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use xogen_schema::FkMode;

/// Flag key for suppressing package-level output.
pub const NOT_FIRST: &str = "not-first";
/// Flag key for the 32-bit signed integer type.
pub const INT32: &str = "int32";
/// Flag key for the 32-bit unsigned integer type.
pub const UINT32: &str = "uint32";
/// Flag key for the package name.
pub const PACKAGE: &str = "pkg";
/// Flag key for build tags.
pub const TAGS: &str = "tags";
/// Flag key for the custom types package.
pub const CUSTOM: &str = "custom";
/// Flag key for the name conflict suffix.
pub const CONFLICT: &str = "conflict";
/// Flag key for identifier escaping.
pub const ESCAPE: &str = "esc";
/// Flag key for foreign key naming.
pub const FK_MODE: &str = "fk-mode";

/// Which identifiers are quoted in generated SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Nothing is escaped.
    #[default]
    None,
    /// Schema names only.
    Schema,
    /// Table names only.
    Table,
    /// Column names only.
    Column,
    /// Everything.
    All,
}

impl EscapeMode {
    /// All legal mode names.
    pub const VALUES: [&'static str; 5] = ["none", "schema", "table", "column", "all"];

    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Column => "column",
            Self::All => "all",
        }
    }

    /// Returns true if schema names are escaped.
    #[must_use]
    pub const fn schema(&self) -> bool {
        matches!(self, Self::Schema | Self::All)
    }

    /// Returns true if table names are escaped.
    #[must_use]
    pub const fn table(&self) -> bool {
        matches!(self, Self::Table | Self::All)
    }

    /// Returns true if column names are escaped.
    #[must_use]
    pub const fn column(&self) -> bool {
        matches!(self, Self::Column | Self::All)
    }
}

impl fmt::Display for EscapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscapeMode {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(Self::None),
            "schema" => Ok(Self::Schema),
            "table" => Ok(Self::Table),
            "column" => Ok(Self::Column),
            "all" => Ok(Self::All),
            other => Err(CodegenError::invalid_flag(
                ESCAPE,
                other,
                format!("expected one of {}", EscapeMode::VALUES.join(", ")),
            )),
        }
    }
}

/// Typed configuration of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppresses package-level templates and the package doc header.
    pub not_first: bool,
    /// Type name used for 32-bit signed integers.
    pub int32_type: String,
    /// Type name used for 32-bit unsigned integers.
    pub uint32_type: String,
    /// Package (module) name.
    pub package: String,
    /// Build tags guarding the generated files.
    pub build_tags: String,
    /// Package holding user-supplied types for unknown database types.
    pub custom_types_package: String,
    /// Suffix appended to conflicting identifiers.
    pub conflict_suffix: String,
    /// Identifier escaping in generated SQL.
    pub escape: EscapeMode,
    /// Foreign key naming mode.
    pub fk_mode: FkMode,
    /// Values of set-specific flags without a typed field.
    pub extra: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            not_first: false,
            int32_type: "int".to_string(),
            uint32_type: "uint".to_string(),
            package: String::new(),
            build_tags: String::new(),
            custom_types_package: String::new(),
            conflict_suffix: "Val".to_string(),
            escape: EscapeMode::None,
            fk_mode: FkMode::Smart,
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolves raw flag values against a template set's flags.
    ///
    /// Flags without a value take their declared default. Flags with neither
    /// keep the [`Config::default`] value.
    ///
    /// # Errors
    /// Returns `CodegenError::InvalidFlag` for unknown keys, values outside an
    /// enumerated flag's legal set, and values that do not parse.
    pub fn resolve(flags: &[Flag], values: &FlagValues) -> Result<Self, CodegenError> {
        for (key, value) in values.iter() {
            if !flags.iter().any(|f| f.key == key) {
                return Err(CodegenError::invalid_flag(key, value, "unknown flag"));
            }
        }

        let mut config = Self::default();
        for flag in flags {
            let Some(raw) = values.get(&flag.key).or(flag.default.as_deref()) else {
                continue;
            };
            flag.check(raw)?;
            config.apply(&flag.key, raw)?;
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, raw: &str) -> Result<(), CodegenError> {
        match key {
            NOT_FIRST => {
                self.not_first = raw.parse().map_err(|_| {
                    CodegenError::invalid_flag(key, raw, "expected true or false")
                })?;
            }
            INT32 => self.int32_type = raw.to_string(),
            UINT32 => self.uint32_type = raw.to_string(),
            PACKAGE => self.package = raw.to_string(),
            TAGS => self.build_tags = raw.to_string(),
            CUSTOM => self.custom_types_package = raw.to_string(),
            CONFLICT => {
                if raw.is_empty() {
                    return Err(CodegenError::invalid_flag(key, raw, "suffix must not be empty"));
                }
                self.conflict_suffix = raw.to_string();
            }
            ESCAPE => self.escape = raw.parse()?,
            FK_MODE => {
                self.fk_mode = raw
                    .parse()
                    .map_err(|e: xogen_schema::SchemaError| {
                        CodegenError::invalid_flag(key, raw, e.to_string())
                    })?;
            }
            _ => {
                self.extra.insert(key.to_string(), raw.to_string());
            }
        }
        Ok(())
    }

    /// Returns the package name, falling back to `fallback` when unset.
    #[must_use]
    pub fn package_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.package.is_empty() {
            fallback
        } else {
            &self.package
        }
    }
}

/// A configuration flag declared by a template set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    /// Context key.
    pub key: String,
    /// Help text.
    pub desc: String,
    /// Short form.
    pub short: Option<char>,
    /// Default value.
    pub default: Option<String>,
    /// Value placeholder for help output.
    pub placeholder: String,
    /// Legal values; empty means any value.
    pub enums: Vec<String>,
}

impl Flag {
    /// Creates a flag.
    #[must_use]
    pub fn new(key: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            desc: desc.into(),
            short: None,
            default: None,
            placeholder: String::new(),
            enums: Vec::new(),
        }
    }

    /// Sets the short form.
    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the help placeholder.
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Restricts the flag to a closed set of values.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enums = values.into_iter().map(Into::into).collect();
        self
    }

    fn check(&self, value: &str) -> Result<(), CodegenError> {
        if self.enums.is_empty() || self.enums.iter().any(|e| e == value) {
            return Ok(());
        }
        Err(CodegenError::invalid_flag(
            &self.key,
            value,
            format!("expected one of {}", self.enums.join(", ")),
        ))
    }
}

/// Raw flag values keyed by flag key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagValues(BTreeMap<String, String>);

impl FlagValues {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates over values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The flags every template set understands.
#[must_use]
pub fn common_flags() -> Vec<Flag> {
    vec![
        Flag::new(NOT_FIRST, "disable package file (ie, not first generated file)")
            .short('2')
            .default_value("false"),
        Flag::new(INT32, "int32 type").short('i').placeholder("int32"),
        Flag::new(UINT32, "uint32 type").short('u').placeholder("uint32"),
        Flag::new(PACKAGE, "package name").short('k').placeholder("<name>"),
        Flag::new(TAGS, "build tags").short('g').placeholder("<tags>"),
        Flag::new(CUSTOM, "package name for custom types")
            .short('C')
            .placeholder("<name>"),
        Flag::new(CONFLICT, "name conflict suffix").placeholder("<suffix>"),
        Flag::new(ESCAPE, "escape fields")
            .default_value("none")
            .placeholder("none")
            .one_of(EscapeMode::VALUES),
        Flag::new(FK_MODE, "foreign key resolution mode")
            .short('j')
            .default_value("smart")
            .placeholder("smart")
            .one_of(FkMode::VALUES),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.int32_type, "int");
        assert_eq!(config.uint32_type, "uint");
        assert_eq!(config.conflict_suffix, "Val");
        assert_eq!(config.escape, EscapeMode::None);
        assert!(!config.not_first);
    }

    #[test]
    fn test_resolve_uses_flag_defaults() {
        let flags = vec![
            Flag::new(INT32, "int32 type").default_value("i32"),
            Flag::new(CONFLICT, "suffix"),
        ];
        let config = Config::resolve(&flags, &FlagValues::new()).expect("Failed to resolve");
        assert_eq!(config.int32_type, "i32");
        assert_eq!(config.conflict_suffix, "Val");
    }

    #[test]
    fn test_resolve_values_override_defaults() {
        let values = FlagValues::new()
            .with(ESCAPE, "all")
            .with(NOT_FIRST, "true")
            .with(PACKAGE, "models");
        let config = Config::resolve(&common_flags(), &values).expect("Failed to resolve");
        assert_eq!(config.escape, EscapeMode::All);
        assert!(config.not_first);
        assert_eq!(config.package, "models");
    }

    #[test]
    fn test_resolve_rejects_unknown_flag() {
        let values = FlagValues::new().with("verbose", "1");
        let err = Config::resolve(&common_flags(), &values).expect_err("should fail");
        assert!(matches!(err, CodegenError::InvalidFlag { ref flag, .. } if flag == "verbose"));
    }

    #[test]
    fn test_resolve_rejects_illegal_enum_value() {
        let values = FlagValues::new().with(ESCAPE, "everything");
        let err = Config::resolve(&common_flags(), &values).expect_err("should fail");
        assert!(matches!(err, CodegenError::InvalidFlag { ref flag, .. } if flag == ESCAPE));
    }

    #[test]
    fn test_resolve_rejects_bad_bool() {
        let values = FlagValues::new().with(NOT_FIRST, "yes");
        assert!(Config::resolve(&common_flags(), &values).is_err());
    }

    #[test]
    fn test_resolve_rejects_empty_conflict_suffix() {
        let values = FlagValues::new().with(CONFLICT, "");
        let err = Config::resolve(&common_flags(), &values).expect_err("should fail");
        assert!(matches!(err, CodegenError::InvalidFlag { ref flag, .. } if flag == CONFLICT));
    }

    #[test]
    fn test_resolve_keeps_set_specific_flags() {
        let flags = vec![Flag::new("derive", "extra derives")];
        let values = FlagValues::new().with("derive", "Hash");
        let config = Config::resolve(&flags, &values).expect("Failed to resolve");
        assert_eq!(config.extra.get("derive").map(String::as_str), Some("Hash"));
    }

    #[test]
    fn test_escape_mode_predicates() {
        assert!(EscapeMode::All.schema() && EscapeMode::All.table() && EscapeMode::All.column());
        assert!(EscapeMode::Table.table());
        assert!(!EscapeMode::Table.column());
        assert!(!EscapeMode::None.schema());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"escape":"column","package":"db"}"#).expect("Failed to parse");
        assert_eq!(config.escape, EscapeMode::Column);
        assert_eq!(config.package, "db");
        assert_eq!(config.int32_type, "int");
    }
}
