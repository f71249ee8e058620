//! Error types for rategen

use crate::schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Rategen errors
///
/// Only resource-acquisition failures are fatal for a generation run.
/// Per-line and per-token problems (unknown triggers, runaway expansion,
/// schema lookups inside emitters) are logged and degraded instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Template not found: {name}: {source}")]
    TemplateNotFound {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output not writable: {}: {source}", path.display())]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sub-template nesting exceeds {depth} levels at {template}")]
    NestingTooDeep { depth: usize, template: String },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_display() {
        let err = Error::TemplateNotFound {
            name: "rate.cbt".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.to_string(), "Template not found: rate.cbt: no such file");
    }

    #[test]
    fn test_from_str() {
        let err: Error = "boom".into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
    }
}
