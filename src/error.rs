use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Which of the two startup artifacts an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Pipeline,
    LabelEncoder,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Pipeline => f.write_str("pipeline"),
            ArtifactKind::LabelEncoder => f.write_str("label encoder"),
        }
    }
}

/// Startup-fatal: without both artifacts no prediction is possible.
#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("failed to read {kind} artifact at {}: {source}", .path.display())]
    Read {
        kind: ArtifactKind,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {kind} artifact at {}: {source}", .path.display())]
    Parse {
        kind: ArtifactKind,
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid {kind} artifact: {reason}")]
    Invalid { kind: ArtifactKind, reason: String },

    #[error("pipeline and label encoder are incompatible: {0}")]
    Incompatible(String),

    #[cfg(feature = "torch")]
    #[error("failed to load TorchScript module {}: {source}", .path.display())]
    Torch {
        path: PathBuf,
        source: tch::TchError,
    },
}

impl ArtifactLoadError {
    pub(crate) fn invalid(kind: ArtifactKind, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }
}

/// Per-request: the record does not fit what the pipeline was trained on.
///
/// The first group of variants is raised while building a typed record from
/// raw JSON, the second while the pipeline encodes the single-row table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaMismatchError {
    #[error("missing field `{field}`")]
    MissingField { field: String },

    #[error("unexpected field `{field}`")]
    UnexpectedField { field: String },

    #[error("field `{field}` must be a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error(
        "field `{field}` has unknown value {value:?} (expected one of: {})",
        .expected.join(", ")
    )]
    UnknownCategory {
        field: String,
        value: String,
        expected: Vec<&'static str>,
    },

    #[error("field `{field}` is {value}, outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field `{field}` must be a whole number, got {value}")]
    NotInteger { field: String, value: f64 },

    #[error("column `{column}` has value {value} not seen during training")]
    UnseenCategory { column: String, value: String },

    #[error("pipeline expects column `{column}` which the row does not have")]
    MissingColumn { column: String },

    #[error("row column `{column}` is not a pipeline feature")]
    UnexpectedColumn { column: String },

    #[error("column `{column}` must be {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("encoded row has {actual} features, classifier expects {expected}")]
    Width { expected: usize, actual: usize },

    #[error("model rejected the encoded row: {0}")]
    Backend(String),
}

impl SchemaMismatchError {
    /// Name of the offending field or column, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field }
            | Self::UnexpectedField { field }
            | Self::WrongType { field, .. }
            | Self::UnknownCategory { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::NotInteger { field, .. } => Some(field.as_str()),
            Self::UnseenCategory { column, .. }
            | Self::MissingColumn { column }
            | Self::UnexpectedColumn { column }
            | Self::ColumnType { column, .. } => Some(column.as_str()),
            Self::Width { .. } | Self::Backend(_) => None,
        }
    }
}
