use std::path::Path;

use crate::encoder::LabelEncoder;
use crate::error::{ArtifactLoadError, SchemaMismatchError};
use crate::model::Pipeline;
use crate::types::{ClassProbability, FeatureRecord, PredictionResult};

/// The loaded artifact pair. Built once at startup and shared read-only by
/// every request; `predict` is a pure function of the artifacts and input.
#[derive(Debug)]
pub struct Predictor {
    pipeline: Pipeline,
    encoder: LabelEncoder,
}

impl Predictor {
    pub fn load(
        pipeline_path: impl AsRef<Path>,
        encoder_path: impl AsRef<Path>,
    ) -> Result<Self, ArtifactLoadError> {
        let pipeline = Pipeline::load(pipeline_path)?;
        let encoder = LabelEncoder::load(encoder_path)?;
        Self::new(pipeline, encoder)
    }

    /// Pair a pipeline with its encoder. Probability columns are taken to be
    /// in encoder order; only the class counts can be checked here.
    pub fn new(pipeline: Pipeline, encoder: LabelEncoder) -> Result<Self, ArtifactLoadError> {
        if pipeline.n_classes() != encoder.len() {
            return Err(ArtifactLoadError::Incompatible(format!(
                "pipeline predicts {} classes, label encoder knows {}",
                pipeline.n_classes(),
                encoder.len()
            )));
        }
        Ok(Self { pipeline, encoder })
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn feature_columns(&self) -> Vec<&str> {
        self.pipeline.feature_columns()
    }

    /// Dry run on the form's default record before serving traffic.
    pub fn warmup(&self) -> Result<PredictionResult, SchemaMismatchError> {
        self.predict(&FeatureRecord::form_default())
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, SchemaMismatchError> {
        let row = record.to_row();
        let index = self.pipeline.predict(&row)?;
        let proba = self.pipeline.predict_proba(&row)?;

        // n_classes == encoder.len() was checked in `new`
        let label = self.encoder.classes()[index].clone();
        Ok(PredictionResult {
            label,
            probabilities: rank(self.encoder.classes(), &proba),
        })
    }
}

/// Percentages (2 decimals) most likely first; equal probabilities keep
/// encoder order.
pub fn rank(classes: &[String], proba: &[f64]) -> Vec<ClassProbability> {
    let mut order: Vec<usize> = (0..classes.len().min(proba.len())).collect();
    order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));
    order
        .into_iter()
        .map(|i| ClassProbability {
            label: classes[i].clone(),
            percent: round2(proba[i] * 100.0),
        })
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rank_sorts_descending_and_rounds() {
        let classes = names(&["a", "b", "c"]);
        let ranked = rank(&classes, &[0.123456, 0.654321, 0.222223]);
        let labels: Vec<&str> = ranked.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c", "a"]);
        assert_eq!(ranked[0].percent, 65.43);
        assert_eq!(ranked[1].percent, 22.22);
        assert_eq!(ranked[2].percent, 12.35);
    }

    #[test]
    fn rank_ties_keep_encoder_order() {
        let classes = names(&["x", "y", "z", "w"]);
        let ranked = rank(&classes, &[0.1, 0.4, 0.1, 0.4]);
        let labels: Vec<&str> = ranked.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["y", "w", "x", "z"]);
    }

    #[test]
    fn class_count_mismatch_is_incompatible() {
        let art = json!({
            "features": [{"kind": "passthrough", "column": "x"}],
            "classifier": {
                "kind": "logistic", "coef": [[1.0], [0.0], [2.0]], "intercept": [0.0, 0.0, 0.0]
            }
        });
        let pipeline = Pipeline::from_json_str(&art.to_string()).unwrap();
        let encoder = LabelEncoder::new(names(&["a", "b"])).unwrap();
        assert!(matches!(
            Predictor::new(pipeline, encoder),
            Err(ArtifactLoadError::Incompatible(_))
        ));
    }

    #[test]
    fn pipeline_without_record_columns_is_a_schema_mismatch() {
        // fit on a single column that a FeatureRecord does not carry
        let art = json!({
            "features": [{"kind": "passthrough", "column": "x"}],
            "classifier": {"kind": "logistic", "coef": [[1.0]], "intercept": [0.0]}
        });
        let pipeline = Pipeline::from_json_str(&art.to_string()).unwrap();
        let encoder = LabelEncoder::new(names(&["no", "yes"])).unwrap();
        let predictor = Predictor::new(pipeline, encoder).unwrap();
        let err = predictor.predict(&FeatureRecord::form_default()).unwrap_err();
        assert!(matches!(err, SchemaMismatchError::UnexpectedColumn { .. }));
    }
}
