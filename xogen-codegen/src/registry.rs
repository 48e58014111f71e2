//! Registry of template sets keyed by target name.

use crate::error::CodegenError;
use crate::template::TemplateSet;
use indexmap::IndexMap;
use std::sync::Arc;

/// Template sets available to generation runs.
///
/// Sets are registered up front through `&mut self` and shared read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    sets: IndexMap<String, Arc<TemplateSet>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in target.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .sets
            .insert(crate::rust::TARGET.to_string(), Arc::new(crate::rust::template_set()));
        registry
    }

    /// Registers a template set under `key`.
    ///
    /// # Errors
    /// Returns `CodegenError::DuplicateEntity` if `key` is already registered.
    pub fn register(&mut self, key: impl Into<String>, set: TemplateSet) -> Result<(), CodegenError> {
        let key = key.into();
        if self.sets.contains_key(&key) {
            return Err(CodegenError::duplicate("target", key));
        }
        tracing::debug!("Registered target '{}' ({})", key, set.file_ext);
        self.sets.insert(key, Arc::new(set));
        Ok(())
    }

    /// Returns the template set registered under `key`.
    ///
    /// # Errors
    /// Returns `CodegenError::UnknownTarget` if nothing is registered under
    /// `key`.
    pub fn lookup(&self, key: &str) -> Result<Arc<TemplateSet>, CodegenError> {
        self.sets
            .get(key)
            .cloned()
            .ok_or_else(|| CodegenError::UnknownTarget {
                key: key.to_string(),
            })
    }

    /// Returns the registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}
