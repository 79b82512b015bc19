use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};

use crate::error::{ArtifactKind, ArtifactLoadError};

#[derive(Deserialize)]
struct EncoderJson {
    classes: Vec<String>,
}

/// Maps classifier class indices to obesity-level names.
///
/// Index `i` is the `i`-th entry of `classes`, which is also the `i`-th column
/// of the pipeline's probability vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).map_err(|source| ArtifactLoadError::Read {
            kind: ArtifactKind::LabelEncoder,
            path: path.to_path_buf(),
            source,
        })?;
        let raw: EncoderJson =
            serde_json::from_str(&txt).map_err(|source| ArtifactLoadError::Parse {
                kind: ArtifactKind::LabelEncoder,
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(raw.classes)
    }

    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactLoadError> {
        if classes.is_empty() {
            return Err(ArtifactLoadError::invalid(
                ArtifactKind::LabelEncoder,
                "no classes",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactLoadError::invalid(
                ArtifactKind::LabelEncoder,
                format!("duplicate class {dup:?}"),
            ));
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}
