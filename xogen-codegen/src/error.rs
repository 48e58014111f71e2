//! Error types for code generation.

use std::fmt;
use thiserror::Error;

/// Error type for code generation operations.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Schema building or validation error.
    #[error("schema error: {0}")]
    Schema(#[from] xogen_schema::SchemaError),

    /// Hand-written query error.
    #[error("query error: {0}")]
    Query(#[from] xogen_schema::QueryError),

    /// No template set is registered under the key.
    #[error("unknown target '{key}'")]
    UnknownTarget {
        /// Requested target key.
        key: String,
    },

    /// Two entities share a name in one scope.
    #[error("duplicate {kind} '{name}'")]
    DuplicateEntity {
        /// Kind of entity.
        kind: String,
        /// Duplicated name.
        name: String,
    },

    /// The generation run was already started.
    #[error("generation run already started (state: {state})")]
    AlreadyStarted {
        /// State of the run.
        state: String,
    },

    /// A flag value is unknown or not one of its legal values.
    #[error("invalid flag '{flag}' = '{value}': {message}")]
    InvalidFlag {
        /// Flag key.
        flag: String,
        /// Offending value.
        value: String,
        /// Error message.
        message: String,
    },

    /// The selected template set does not provide a template.
    #[error("template '{template}' not found (rendering {entity})")]
    TemplateNotFound {
        /// Template name.
        template: String,
        /// Entity being rendered.
        entity: String,
    },

    /// A template failed to render.
    #[error("template '{template}' failed for {entity}: {source}")]
    RenderFailed {
        /// Template name.
        template: String,
        /// Entity being rendered.
        entity: String,
        /// Underlying error.
        #[source]
        source: RenderError,
    },

    /// The post-processing hook rejected generated output.
    #[error("post-processing '{file}' failed: {source}")]
    PostProcessFailed {
        /// Output file name.
        file: String,
        /// Underlying error.
        #[source]
        source: PostError,
    },
}

impl CodegenError {
    /// Creates a duplicate entity error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid flag error.
    pub fn invalid_flag(
        flag: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidFlag {
            flag: flag.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Error raised by a template while rendering.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RenderError {
    /// Error message.
    pub message: String,
}

impl RenderError {
    /// Creates a render error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<fmt::Error> for RenderError {
    fn from(_: fmt::Error) -> Self {
        Self::new("formatter error")
    }
}

/// Error raised by a post-processing hook.
#[derive(Debug, Error)]
pub struct PostError {
    /// Error message.
    pub message: String,
    /// 1-based line of the offending token, if known.
    pub line: Option<usize>,
    /// 1-based column of the offending token, if known.
    pub column: Option<usize>,
}

impl PostError {
    /// Creates a post-processing error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}: {}", line, column, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_error_display() {
        assert_eq!(PostError::new("expected `;`").to_string(), "expected `;`");
        assert_eq!(
            PostError::new("expected `;`").at(3, 7).to_string(),
            "3:7: expected `;`"
        );
    }

    #[test]
    fn test_render_failed_names_template_and_entity() {
        let err = CodegenError::RenderFailed {
            template: "typedef".to_string(),
            entity: "table 'user'".to_string(),
            source: RenderError::new("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("typedef"));
        assert!(msg.contains("table 'user'"));
        assert!(msg.contains("boom"));
    }
}
