//! Enum code generation.

use super::{doc, literal, type_ident};
use crate::error::RenderError;
use crate::template::{Entity, RenderContext};
use std::collections::HashSet;
use xogen_schema::naming::to_pascal_case;
use xogen_schema::{Enum, Field};

/// Renders an enum with its string conversions.
///
/// The first value is the default. Constant values become discriminants
/// when every value carries a distinct one.
///
/// # Errors
/// Returns `RenderError` if the entity is not an enum.
pub fn render(ctx: &RenderContext<'_>, out: &mut String) -> Result<(), RenderError> {
    let Entity::Enum(enum_def) = ctx.entity() else {
        return Err(RenderError::new(format!("enum cannot render {}", ctx.entity())));
    };
    let name = type_ident(ctx, &enum_def.name);
    let variants = variants(ctx, enum_def);
    let discriminants = discriminants(enum_def);

    if enum_def.comment.is_empty() {
        doc(out, "", &format!("Values of the '{}' enum.", enum_def.name));
    } else {
        doc(out, "", &enum_def.comment);
    }
    if variants.is_empty() {
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]\n");
    } else {
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]\n");
    }
    if discriminants.is_some() {
        out.push_str("#[repr(i64)]\n");
    }
    out.push_str(&format!("pub enum {} {{\n", name));
    for (i, (variant, value)) in variants.iter().enumerate() {
        if !value.comment.is_empty() {
            doc(out, "    ", &value.comment);
        }
        if i == 0 {
            out.push_str("    #[default]\n");
        }
        match discriminants.as_ref() {
            Some(values) => out.push_str(&format!("    {} = {},\n", variant, values[i])),
            None => out.push_str(&format!("    {},\n", variant)),
        }
    }
    out.push_str("}\n\n");

    let listed: Vec<String> = variants.iter().map(|(v, _)| format!("Self::{}", v)).collect();
    out.push_str(&format!("impl {} {{\n", name));
    out.push_str("    /// Every value, in declaration order.\n");
    out.push_str(&format!(
        "    pub const VALUES: &'static [Self] = &[{}];\n\n",
        listed.join(", ")
    ));
    out.push_str("    /// Returns the database value.\n");
    out.push_str("    pub fn as_str(&self) -> &'static str {\n");
    if variants.is_empty() {
        out.push_str("        match *self {}\n");
    } else {
        out.push_str("        match self {\n");
        for (variant, value) in &variants {
            out.push_str(&format!(
                "            Self::{} => {},\n",
                variant,
                literal(&value.name)
            ));
        }
        out.push_str("        }\n");
    }
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str(&format!("impl std::fmt::Display for {} {{\n", name));
    out.push_str("    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {\n");
    out.push_str("        f.write_str(self.as_str())\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str(&format!("impl std::str::FromStr for {} {{\n", name));
    out.push_str("    type Err = XoError;\n\n");
    out.push_str("    fn from_str(s: &str) -> Result<Self, Self::Err> {\n");
    out.push_str("        match s {\n");
    for (variant, value) in &variants {
        out.push_str(&format!(
            "            {} => Ok(Self::{}),\n",
            literal(&value.name),
            variant
        ));
    }
    out.push_str(&format!(
        "            _ => Err(XoError::Decode(format!(\"invalid {} value '{{}}'\", s))),\n",
        name
    ));
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str(&format!("impl ToValue for {} {{\n", name));
    out.push_str("    fn to_value(&self) -> Value {\n");
    out.push_str("        Value::Text(self.as_str().to_string())\n");
    out.push_str("    }\n");
    out.push_str("}\n\n");

    out.push_str(&format!("impl FromValue for {} {{\n", name));
    out.push_str("    fn from_value(value: Value) -> Result<Self, XoError> {\n");
    out.push_str("        match value {\n");
    out.push_str("            Value::Text(s) => s.parse(),\n");
    out.push_str(&format!(
        "            other => Err(XoError::Decode(format!(\"expected {}, got {{:?}}\", other))),\n",
        name
    ));
    out.push_str("        }\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    Ok(())
}

/// Names the variants of `enum_def`, in declaration order.
fn variants<'a>(ctx: &RenderContext<'_>, enum_def: &'a Enum) -> Vec<(String, &'a Field)> {
    let mut scope = ctx.scope();
    enum_def
        .values
        .iter()
        .map(|value| {
            let variant = scope.claim_with(&value.name, |s| {
                let s = to_pascal_case(s);
                if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("V{}", s)
                } else {
                    s
                }
            });
            (variant, value)
        })
        .collect()
}

/// Returns the discriminants if every value has a distinct constant.
fn discriminants(enum_def: &Enum) -> Option<Vec<i64>> {
    let values: Vec<i64> = enum_def
        .values
        .iter()
        .map(|v| v.const_value)
        .collect::<Option<_>>()?;
    let unique: HashSet<i64> = values.iter().copied().collect();
    (!values.is_empty() && unique.len() == values.len()).then_some(values)
}
