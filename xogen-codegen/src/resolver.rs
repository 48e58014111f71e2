//! Type and identifier resolution.
//!
//! [`TypeResolver`] knows which target types are built in and how each type
//! abbreviates to a short local variable name. [`NameScope`] hands out
//! collision-free identifiers within one render.

use std::collections::{HashMap, HashSet};

/// Types known to every template set.
pub const DEFAULT_KNOWN_TYPES: &[&str] = &[
    "bool", "string", "byte", "rune", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
    "uint16", "uint32", "uint64", "float32", "float64", "Slice", "StringSlice",
];

/// Abbreviations shared by every template set.
pub const DEFAULT_SHORT_NAMES: &[(&str, &str)] = &[
    ("bool", "b"),
    ("string", "s"),
    ("byte", "b"),
    ("rune", "r"),
    ("int", "i"),
    ("int8", "i"),
    ("int16", "i"),
    ("int32", "i"),
    ("int64", "i"),
    ("uint", "u"),
    ("uint8", "u"),
    ("uint16", "u"),
    ("uint32", "u"),
    ("uint64", "u"),
    ("float32", "f"),
    ("float64", "f"),
    ("Slice", "s"),
    ("StringSlice", "ss"),
];

/// Resolves type names and abbreviations for one template set.
#[derive(Debug, Clone)]
pub struct TypeResolver {
    known: HashSet<String>,
    short_names: HashMap<String, String>,
    reserved: HashSet<String>,
    conflict_suffix: String,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_KNOWN_TYPES.iter().copied(),
            DEFAULT_SHORT_NAMES.iter().copied(),
        )
    }
}

impl TypeResolver {
    /// Creates a resolver from known types and an abbreviation table.
    pub fn new<'a>(
        known: impl IntoIterator<Item = &'a str>,
        short_names: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            known: known.into_iter().map(str::to_string).collect(),
            short_names: short_names
                .into_iter()
                .map(|(t, s)| (t.to_string(), s.to_string()))
                .collect(),
            reserved: HashSet::new(),
            conflict_suffix: "Val".to_string(),
        }
    }

    /// Registers a known type.
    pub fn add_type(&mut self, type_name: impl Into<String>) {
        self.known.insert(type_name.into());
    }

    /// Registers an abbreviation.
    pub fn add_short_name(&mut self, type_name: impl Into<String>, short: impl Into<String>) {
        self.short_names.insert(type_name.into(), short.into());
    }

    /// Registers reserved words.
    pub fn reserve<'a>(&mut self, words: impl IntoIterator<Item = &'a str>) {
        self.reserved.extend(words.into_iter().map(str::to_string));
    }

    /// Sets the suffix appended to conflicting identifiers.
    pub fn set_conflict_suffix(&mut self, suffix: impl Into<String>) {
        self.conflict_suffix = suffix.into();
    }

    /// Returns the conflict suffix.
    #[must_use]
    pub fn conflict_suffix(&self) -> &str {
        &self.conflict_suffix
    }

    /// Returns true if the type is known.
    #[must_use]
    pub fn is_known(&self, type_name: &str) -> bool {
        self.known.contains(type_name)
    }

    /// Returns true if the identifier is reserved.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Returns the abbreviation of a type.
    ///
    /// Types missing from the table abbreviate to the lower-cased initials of
    /// their last path segment.
    #[must_use]
    pub fn abbreviate(&self, type_name: &str) -> String {
        if let Some(short) = self.short_names.get(type_name) {
            return short.clone();
        }
        initials(type_name)
    }

    /// Starts a naming scope.
    #[must_use]
    pub fn scope(&self) -> NameScope<'_> {
        NameScope {
            resolver: self,
            used: HashSet::new(),
            counts: HashMap::new(),
        }
    }
}

fn initials(type_name: &str) -> String {
    let base = type_name
        .trim_start_matches('&')
        .split('<')
        .next()
        .unwrap_or_default();
    let segment = base
        .rsplit(|c| c == ':' || c == '.')
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let mut chars = segment.chars().filter(char::is_ascii_alphanumeric);
    let Some(first) = chars.next().filter(char::is_ascii_alphabetic) else {
        return "v".to_string();
    };
    let mut out = first.to_ascii_lowercase().to_string();
    out.extend(chars.filter(char::is_ascii_uppercase).map(|c| c.to_ascii_lowercase()));
    out
}

/// Identifiers used within one render.
#[derive(Debug)]
pub struct NameScope<'a> {
    resolver: &'a TypeResolver,
    used: HashSet<String>,
    counts: HashMap<String, usize>,
}

impl NameScope<'_> {
    /// Returns a short variable name for a value of `type_name`.
    ///
    /// Repeated types get a numeric suffix in first-seen order: `i`, `i2`.
    pub fn short_name(&mut self, type_name: &str) -> String {
        let abbr = self.resolver.abbreviate(type_name);
        let count = self.counts.entry(abbr.clone()).or_insert(0);
        *count += 1;
        let candidate = if *count == 1 {
            abbr
        } else {
            format!("{}{}", abbr, count)
        };
        self.claim(&candidate)
    }

    /// Claims `name`, appending the conflict suffix until it is unique.
    pub fn claim(&mut self, name: &str) -> String {
        self.claim_with(name, str::to_string)
    }

    /// Claims a name after passing every candidate through `normalize`.
    ///
    /// When `normalize` undoes the conflict suffix, the name falls back to a
    /// numeric suffix: `type2`, `type3`.
    pub fn claim_with(&mut self, name: &str, normalize: impl Fn(&str) -> String) -> String {
        let mut candidate = normalize(name);
        let mut tried = HashSet::new();
        while self.is_taken(&candidate) {
            tried.insert(candidate.clone());
            let next = normalize(&format!("{}{}", candidate, self.resolver.conflict_suffix));
            if tried.contains(&next) {
                candidate = self.numbered(&candidate, &normalize);
                break;
            }
            candidate = next;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    /// Returns `base` with the first free number appended.
    fn numbered(&self, base: &str, normalize: &impl Fn(&str) -> String) -> String {
        (2usize..)
            .map(|n| {
                let raw = format!("{}{}", base, n);
                let normalized = normalize(&raw);
                if self.is_taken(&normalized) { raw } else { normalized }
            })
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or_default()
    }

    /// Marks a name as used without renaming it.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    fn is_taken(&self, name: &str) -> bool {
        name.is_empty() || self.used.contains(name) || self.resolver.is_reserved(name)
    }
}
