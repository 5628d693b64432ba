//! Structured error types shared across cooltab crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and context carried by every [`GridError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable identifier such as `grid_step_zero` or `mmw_missing`.
    pub code: String,
    /// Diagnostic text.
    pub message: String,
    /// Offending paths, indices and lines keyed by name.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix, if one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with an empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Records the artifact a failure refers to under the `path` key.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Attaches a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for grid assembly and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum GridError {
    /// A `vary`/`grid` declaration could not be parsed or has a zero step.
    #[error("malformed grid spec: {0}")]
    MalformedGridSpec(ErrorInfo),
    /// No artifact file exists for a grid point.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(ErrorInfo),
    /// A per-point artifact or run summary contains an unreadable data line.
    #[error("malformed artifact: {0}")]
    MalformedArtifact(ErrorInfo),
    /// Density or temperature columns could not be identified.
    #[error("ambiguous axis binding: {0}")]
    AmbiguousAxisBinding(ErrorInfo),
    /// A field required by the table schema is absent for a retained point.
    #[error("missing derived field: {0}")]
    MissingDerivedField(ErrorInfo),
    /// Coordinate, flat index or axis-size inconsistencies.
    #[error("shape error: {0}")]
    Shape(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        let mut entries = self.context.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, " | context: [{key}={value}")?;
            for (key, value) in entries {
                write!(f, ", {key}={value}")?;
            }
            f.write_str("]")?;
        }
        match &self.hint {
            Some(hint) => write!(f, " | hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl GridError {
    /// Payload shared by all variants.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            GridError::MalformedGridSpec(info)
            | GridError::ArtifactNotFound(info)
            | GridError::MalformedArtifact(info)
            | GridError::AmbiguousAxisBinding(info)
            | GridError::MissingDerivedField(info)
            | GridError::Shape(info)
            | GridError::Io(info)
            | GridError::Serde(info) => info,
        }
    }

    /// Returns true when the failure concerns a single grid point and the batch may continue.
    pub fn is_point_local(&self) -> bool {
        matches!(self, GridError::ArtifactNotFound(_))
    }

    /// Wraps an I/O failure with the offending path.
    pub fn io(code: &str, path: impl AsRef<Path>, err: impl ToString) -> Self {
        GridError::Io(ErrorInfo::new(code, err.to_string()).with_path(path.as_ref()))
    }
}
