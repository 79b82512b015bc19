use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use crate::error::{ArtifactKind, ArtifactLoadError, SchemaMismatchError};
use crate::types::{Cell, Row};

// ---------- Artifact layout ----------

#[derive(Deserialize)]
struct PipelineJson {
    features: Vec<FeatureStep>,
    classifier: ClassifierJson,
}

/// One column of the fitted preprocessing stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureStep {
    OneHot {
        column: String,
        categories: Vec<Level>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Standard {
        column: String,
        mean: f64,
        scale: f64,
    },
    Passthrough {
        column: String,
    },
}

/// A category seen at fit time. Numeric levels let a one-hot step consume
/// integer-coded answers such as FCVC.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Number(f64),
    Text(String),
}

impl Level {
    fn matches(&self, cell: &Cell) -> bool {
        match (self, cell) {
            (Level::Number(a), Cell::Number(b)) => a == b,
            (Level::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierJson {
    Logistic {
        #[serde(default)]
        classes: Option<Vec<usize>>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    Forest {
        #[serde(default)]
        classes: Option<Vec<usize>>,
        n_features: usize,
        trees: Vec<Vec<TreeNode>>,
    },
    #[cfg(feature = "torch")]
    Torchscript {
        #[serde(default)]
        classes: Option<Vec<usize>>,
        path: PathBuf,
        n_features: usize,
    },
}

fn invalid(reason: impl Into<String>) -> ArtifactLoadError {
    ArtifactLoadError::invalid(ArtifactKind::Pipeline, reason)
}

// ---------- Preprocessing ----------

impl FeatureStep {
    pub fn column(&self) -> &str {
        match self {
            FeatureStep::OneHot { column, .. }
            | FeatureStep::Standard { column, .. }
            | FeatureStep::Passthrough { column } => column.as_str(),
        }
    }

    fn width(&self) -> usize {
        match self {
            FeatureStep::OneHot { categories, .. } => categories.len(),
            FeatureStep::Standard { .. } | FeatureStep::Passthrough { .. } => 1,
        }
    }

    fn check(&self) -> Result<(), ArtifactLoadError> {
        match self {
            FeatureStep::OneHot {
                column, categories, ..
            } => {
                if categories.is_empty() {
                    return Err(invalid(format!("one_hot `{column}` has no categories")));
                }
                for (i, level) in categories.iter().enumerate() {
                    if categories[..i].contains(level) {
                        return Err(invalid(format!(
                            "one_hot `{column}` repeats category {level:?}"
                        )));
                    }
                }
            }
            FeatureStep::Standard { column, mean, scale } => {
                if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                    return Err(invalid(format!(
                        "standard `{column}` needs finite mean and non-zero scale"
                    )));
                }
            }
            FeatureStep::Passthrough { .. } => {}
        }
        Ok(())
    }

    fn encode(&self, row: &Row, out: &mut Vec<f64>) -> Result<(), SchemaMismatchError> {
        let column = self.column();
        let cell = row
            .get(column)
            .ok_or_else(|| SchemaMismatchError::MissingColumn {
                column: column.to_string(),
            })?;

        match self {
            FeatureStep::OneHot {
                categories,
                handle_unknown,
                ..
            } => {
                let hot = categories.iter().position(|level| level.matches(cell));
                if hot.is_none() && *handle_unknown == HandleUnknown::Error {
                    return Err(SchemaMismatchError::UnseenCategory {
                        column: column.to_string(),
                        value: cell.to_string(),
                    });
                }
                out.extend((0..categories.len()).map(|i| if Some(i) == hot { 1.0 } else { 0.0 }));
            }
            FeatureStep::Standard { mean, scale, .. } => {
                out.push((numeric(column, cell)? - mean) / scale);
            }
            FeatureStep::Passthrough { .. } => {
                out.push(numeric(column, cell)?);
            }
        }
        Ok(())
    }
}

fn numeric(column: &str, cell: &Cell) -> Result<f64, SchemaMismatchError> {
    match cell {
        Cell::Number(n) => Ok(*n),
        Cell::Text(_) => Err(SchemaMismatchError::ColumnType {
            column: column.to_string(),
            expected: "numeric",
        }),
    }
}

/// Column-wise encoding of a single-row table into the classifier's input.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    steps: Vec<FeatureStep>,
}

impl Preprocessor {
    pub fn new(steps: Vec<FeatureStep>) -> Result<Self, ArtifactLoadError> {
        if steps.is_empty() {
            return Err(invalid("no feature steps"));
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.column()) {
                return Err(invalid(format!("column `{}` declared twice", step.column())));
            }
            step.check()?;
        }
        Ok(Self { steps })
    }

    pub fn width(&self) -> usize {
        self.steps.iter().map(FeatureStep::width).sum()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(FeatureStep::column)
    }

    pub fn transform(&self, row: &Row) -> Result<Vec<f64>, SchemaMismatchError> {
        if let Some(extra) = row.columns().find(|c| !self.columns().any(|known| known == *c)) {
            return Err(SchemaMismatchError::UnexpectedColumn {
                column: extra.to_string(),
            });
        }
        let mut out = Vec::with_capacity(self.width());
        for step in &self.steps {
            step.encode(row, &mut out)?;
        }
        Ok(out)
    }
}

// ---------- Classifiers ----------

/// Multinomial (or binary, with a single coefficient row) logistic regression.
#[derive(Debug, Clone)]
pub struct Logistic {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    n_features: usize,
}

impl Logistic {
    pub fn new(coef: Vec<Vec<f64>>, intercept: Vec<f64>) -> Result<Self, ArtifactLoadError> {
        let n_features = coef.first().map_or(0, Vec::len);
        if n_features == 0 {
            return Err(invalid("logistic coef is empty"));
        }
        if coef.iter().any(|r| r.len() != n_features) {
            return Err(invalid("logistic coef rows differ in length"));
        }
        if intercept.len() != coef.len() {
            return Err(invalid(format!(
                "logistic has {} coef rows but {} intercepts",
                coef.len(),
                intercept.len()
            )));
        }
        Ok(Self {
            coef,
            intercept,
            n_features,
        })
    }

    fn n_classes(&self) -> usize {
        if self.coef.len() == 1 {
            2
        } else {
            self.coef.len()
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let z: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| w.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        if z.len() == 1 {
            let p = 1.0 / (1.0 + (-z[0]).exp());
            return vec![1.0 - p, p];
        }
        softmax(&z)
    }
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

/// A fitted tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// `x[feature] <= threshold` goes left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class training counts (or weights) of samples reaching the leaf.
    Leaf { value: Vec<f64> },
}

/// Averaged per-tree leaf distributions, as a random forest does.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Vec<TreeNode>>,
    n_features: usize,
    n_classes: usize,
}

impl Forest {
    pub fn new(trees: Vec<Vec<TreeNode>>, n_features: usize) -> Result<Self, ArtifactLoadError> {
        if trees.is_empty() {
            return Err(invalid("forest has no trees"));
        }
        let n_classes = trees
            .iter()
            .flatten()
            .find_map(|node| match node {
                TreeNode::Leaf { value } => Some(value.len()),
                TreeNode::Split { .. } => None,
            })
            .ok_or_else(|| invalid("forest has no leaves"))?;

        for (t, nodes) in trees.iter().enumerate() {
            if nodes.is_empty() {
                return Err(invalid(format!("tree {t} is empty")));
            }
            for (i, node) in nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= n_features {
                            return Err(invalid(format!(
                                "tree {t} node {i} splits on feature {feature} of {n_features}"
                            )));
                        }
                        // children after parents keeps traversal acyclic
                        if [left, right].iter().any(|&&c| c <= i || c >= nodes.len()) {
                            return Err(invalid(format!("tree {t} node {i} has a bad child index")));
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != n_classes
                            || value.iter().any(|v| !(*v >= 0.0))
                            || value.iter().sum::<f64>() <= 0.0
                        {
                            return Err(invalid(format!(
                                "tree {t} leaf {i} has a bad distribution"
                            )));
                        }
                    }
                }
            }
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    fn leaf<'a>(nodes: &'a [TreeNode], x: &[f64]) -> &'a [f64] {
        let mut idx = 0;
        loop {
            match &nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[*feature] <= *threshold { *left } else { *right },
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for nodes in &self.trees {
            let value = Self::leaf(nodes, x);
            let total: f64 = value.iter().sum();
            for (p, v) in proba.iter_mut().zip(value) {
                *p += v / total;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }
}

#[cfg(feature = "torch")]
pub use torch::TorchScript;

#[cfg(feature = "torch")]
mod torch {
    use super::*;
    use tch::{kind::Kind, CModule, Device, Tensor};

    /// TorchScript classifier whose forward pass yields `[1, n_classes]` logits.
    pub struct TorchScript {
        module: CModule,
        device: Device,
        n_features: usize,
        n_classes: usize,
    }

    impl std::fmt::Debug for TorchScript {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TorchScript")
                .field("n_features", &self.n_features)
                .field("n_classes", &self.n_classes)
                .finish()
        }
    }

    impl TorchScript {
        pub fn load(path: &Path, n_features: usize) -> Result<Self, ArtifactLoadError> {
            let device = Device::Cpu;
            let module = CModule::load_on_device(path, device).map_err(|source| {
                ArtifactLoadError::Torch {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

            // Probe output shape with a dummy forward; expect [1, C]
            let dummy = Tensor::zeros([1, n_features as i64], (Kind::Float, device));
            let out = module
                .forward_ts(&[dummy])
                .map_err(|source| ArtifactLoadError::Torch {
                    path: path.to_path_buf(),
                    source,
                })?;
            let sz = out.size();
            if sz.len() != 2 || sz[0] != 1 || sz[1] < 2 {
                return Err(invalid(format!("unexpected TorchScript output size: {sz:?}")));
            }

            Ok(Self {
                module,
                device,
                n_features,
                n_classes: sz[1] as usize,
            })
        }

        pub(super) fn n_features(&self) -> usize {
            self.n_features
        }

        pub(super) fn n_classes(&self) -> usize {
            self.n_classes
        }

        pub(super) fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, SchemaMismatchError> {
            let xs: Vec<f32> = x.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&xs)
                .reshape([1, self.n_features as i64])
                .to_device(self.device);
            let logits = self
                .module
                .forward_ts(&[input])
                .map_err(|e| SchemaMismatchError::Backend(e.to_string()))?;
            let proba = logits.softmax(-1, Kind::Double).view([-1]);
            Vec::<f64>::try_from(&proba).map_err(|e| SchemaMismatchError::Backend(e.to_string()))
        }
    }
}

/// The fitted estimator at the end of the pipeline.
#[derive(Debug)]
pub enum Classifier {
    Logistic(Logistic),
    Forest(Forest),
    #[cfg(feature = "torch")]
    TorchScript(TorchScript),
}

impl Classifier {
    fn from_json(raw: ClassifierJson, base: &Path) -> Result<Self, ArtifactLoadError> {
        let (classes, clf) = match raw {
            ClassifierJson::Logistic {
                classes,
                coef,
                intercept,
            } => (classes, Classifier::Logistic(Logistic::new(coef, intercept)?)),
            ClassifierJson::Forest {
                classes,
                n_features,
                trees,
            } => (classes, Classifier::Forest(Forest::new(trees, n_features)?)),
            #[cfg(feature = "torch")]
            ClassifierJson::Torchscript {
                classes,
                path,
                n_features,
            } => {
                let path = if path.is_absolute() { path } else { base.join(path) };
                (
                    classes,
                    Classifier::TorchScript(TorchScript::load(&path, n_features)?),
                )
            }
        };
        #[cfg(not(feature = "torch"))]
        let _ = base;

        // Encoded targets: the label encoder owns the names.
        if let Some(classes) = classes {
            let expected: Vec<usize> = (0..clf.n_classes()).collect();
            if classes != expected {
                return Err(invalid(format!(
                    "classifier classes {classes:?} must be {expected:?}"
                )));
            }
        }
        Ok(clf)
    }

    pub fn n_features(&self) -> usize {
        match self {
            Classifier::Logistic(m) => m.n_features,
            Classifier::Forest(m) => m.n_features,
            #[cfg(feature = "torch")]
            Classifier::TorchScript(m) => m.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            Classifier::Logistic(m) => m.n_classes(),
            Classifier::Forest(m) => m.n_classes,
            #[cfg(feature = "torch")]
            Classifier::TorchScript(m) => m.n_classes(),
        }
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, SchemaMismatchError> {
        if x.len() != self.n_features() {
            return Err(SchemaMismatchError::Width {
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        match self {
            Classifier::Logistic(m) => Ok(m.predict_proba(x)),
            Classifier::Forest(m) => Ok(m.predict_proba(x)),
            #[cfg(feature = "torch")]
            Classifier::TorchScript(m) => m.predict_proba(x),
        }
    }
}

/// Index of the first maximum.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

// ---------- Pipeline ----------

/// Fitted preprocessing plus classifier, loaded once and never mutated.
#[derive(Debug)]
pub struct Pipeline {
    preprocessor: Preprocessor,
    classifier: Classifier,
}

impl Pipeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path).map_err(|source| ArtifactLoadError::Read {
            kind: ArtifactKind::Pipeline,
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&txt, path, base)
    }

    /// Build from an in-memory artifact; relative paths resolve against `.`.
    pub fn from_json_str(txt: &str) -> Result<Self, ArtifactLoadError> {
        Self::parse(txt, Path::new("<memory>"), Path::new("."))
    }

    fn parse(txt: &str, path: &Path, base: &Path) -> Result<Self, ArtifactLoadError> {
        let raw: PipelineJson = serde_json::from_str(txt).map_err(|source| {
            ArtifactLoadError::Parse {
                kind: ArtifactKind::Pipeline,
                path: PathBuf::from(path),
                source,
            }
        })?;
        let preprocessor = Preprocessor::new(raw.features)?;
        let classifier = Classifier::from_json(raw.classifier, base)?;
        Self::new(preprocessor, classifier)
    }

    pub fn new(
        preprocessor: Preprocessor,
        classifier: Classifier,
    ) -> Result<Self, ArtifactLoadError> {
        if preprocessor.width() != classifier.n_features() {
            return Err(invalid(format!(
                "preprocessing yields {} features, classifier expects {}",
                preprocessor.width(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            preprocessor,
            classifier,
        })
    }

    pub fn feature_columns(&self) -> Vec<&str> {
        self.preprocessor.columns().collect()
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    pub fn n_classes(&self) -> usize {
        self.classifier.n_classes()
    }

    pub fn transform(&self, row: &Row) -> Result<Vec<f64>, SchemaMismatchError> {
        self.preprocessor.transform(row)
    }

    /// Probability per encoded class, in class-index order.
    pub fn predict_proba(&self, row: &Row) -> Result<Vec<f64>, SchemaMismatchError> {
        let x = self.transform(row)?;
        self.classifier.predict_proba(&x)
    }

    /// Encoded class index of the most probable class.
    pub fn predict(&self, row: &Row) -> Result<usize, SchemaMismatchError> {
        Ok(argmax(&self.predict_proba(row)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small_logistic() -> Pipeline {
        let art = json!({
            "features": [
                {"kind": "one_hot", "column": "color", "categories": ["red", "blue"]},
                {"kind": "standard", "column": "size", "mean": 10.0, "scale": 2.0},
                {
                    "kind": "one_hot", "column": "level",
                    "categories": [1, 2, 3], "handle_unknown": "ignore"
                }
            ],
            "classifier": {
                "kind": "logistic",
                "classes": [0, 1, 2],
                "coef": [
                    [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
                    [0.0, 0.0, 1.0, 0.0, 0.0, 0.0]
                ],
                "intercept": [0.0, 0.0, 0.0]
            }
        });
        Pipeline::from_json_str(&art.to_string()).unwrap()
    }

    fn row(color: &str, size: f64, level: f64) -> Row {
        Row::new()
            .with("color", Cell::text(color))
            .with("size", Cell::Number(size))
            .with("level", Cell::Number(level))
    }

    #[test]
    fn encodes_in_declared_order() {
        let p = small_logistic();
        assert_eq!(p.n_features(), 6);
        let x = p.transform(&row("blue", 14.0, 2.0)).unwrap();
        assert_eq!(x, vec![0.0, 1.0, 2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unknown_level_ignored_when_allowed() {
        let p = small_logistic();
        let x = p.transform(&row("red", 10.0, 7.0)).unwrap();
        assert_eq!(x, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_category_rejected_by_default() {
        let p = small_logistic();
        let err = p.transform(&row("green", 10.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            SchemaMismatchError::UnseenCategory {
                column: "color".into(),
                value: "\"green\"".into()
            }
        );
    }

    #[test]
    fn row_columns_must_match() {
        let p = small_logistic();
        let mut r = row("red", 10.0, 1.0);
        r.remove("size");
        assert_eq!(
            p.transform(&r).unwrap_err(),
            SchemaMismatchError::MissingColumn {
                column: "size".into()
            }
        );

        let r = row("red", 10.0, 1.0).with("Size", Cell::Number(1.0));
        assert_eq!(
            p.transform(&r).unwrap_err(),
            SchemaMismatchError::UnexpectedColumn {
                column: "Size".into()
            }
        );

        let r = row("red", 10.0, 1.0).with("size", Cell::text("big"));
        assert!(matches!(
            p.transform(&r).unwrap_err(),
            SchemaMismatchError::ColumnType { .. }
        ));
    }

    #[test]
    fn numeric_level_does_not_match_text() {
        let p = small_logistic();
        let r = row("red", 10.0, 1.0).with("color", Cell::Number(1.0));
        assert!(matches!(
            p.transform(&r).unwrap_err(),
            SchemaMismatchError::UnseenCategory { .. }
        ));
    }

    #[test]
    fn logistic_softmax_and_argmax() {
        let p = small_logistic();
        let proba = p.predict_proba(&row("blue", 10.0, 1.0)).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let e = std::f64::consts::E;
        assert!((proba[1] - e / (e + 2.0)).abs() < 1e-12);
        assert_eq!(p.predict(&row("blue", 10.0, 1.0)).unwrap(), 1);
    }

    #[test]
    fn binary_logistic_uses_sigmoid() {
        let m = Logistic::new(vec![vec![2.0]], vec![0.0]).unwrap();
        assert_eq!(m.n_classes(), 2);
        let p = m.predict_proba(&[0.0]);
        assert_eq!(p, vec![0.5, 0.5]);
        let p = m.predict_proba(&[1.0]);
        assert!(p[1] > 0.88 && p[1] < 0.89);
    }

    #[test]
    fn argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5]), 0);
    }

    #[test]
    fn forest_averages_normalised_leaves() {
        let art = json!({
            "features": [
                {"kind": "passthrough", "column": "x"}
            ],
            "classifier": {
                "kind": "forest",
                "n_features": 1,
                "trees": [
                    [
                        {"feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                        {"value": [8.0, 2.0]},
                        {"value": [0.0, 5.0]}
                    ],
                    [
                        {"value": [1.0, 1.0]}
                    ]
                ]
            }
        });
        let p = Pipeline::from_json_str(&art.to_string()).unwrap();
        assert_eq!(p.n_classes(), 2);

        let lo = p.predict_proba(&Row::new().with("x", Cell::Number(0.0))).unwrap();
        assert!((lo[0] - 0.65).abs() < 1e-12);
        assert!((lo[1] - 0.35).abs() < 1e-12);

        let hi = p.predict_proba(&Row::new().with("x", Cell::Number(1.0))).unwrap();
        assert!((hi[0] - 0.25).abs() < 1e-12);
        assert_eq!(p.predict(&Row::new().with("x", Cell::Number(1.0))).unwrap(), 1);
    }

    #[test]
    fn forest_rejects_backward_child() {
        let trees = vec![vec![
            TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 1,
            },
            TreeNode::Leaf {
                value: vec![1.0, 0.0],
            },
        ]];
        assert!(matches!(
            Forest::new(trees, 1),
            Err(ArtifactLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn width_mismatch_is_a_load_error() {
        let art = json!({
            "features": [{"kind": "passthrough", "column": "x"}],
            "classifier": {
                "kind": "logistic", "coef": [[1.0, 2.0], [0.0, 1.0]], "intercept": [0.0, 0.0]
            }
        });
        let err = Pipeline::from_json_str(&art.to_string()).unwrap_err();
        assert!(err.to_string().contains("preprocessing yields 1 features"));
    }

    #[test]
    fn classes_must_be_encoded_range() {
        let art = json!({
            "features": [{"kind": "passthrough", "column": "x"}],
            "classifier": {
                "kind": "logistic", "classes": [1, 0],
                "coef": [[1.0], [0.0]], "intercept": [0.0, 0.0]
            }
        });
        assert!(matches!(
            Pipeline::from_json_str(&art.to_string()),
            Err(ArtifactLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn bad_steps_rejected() {
        let dup = json!({
            "features": [
                {"kind": "passthrough", "column": "x"},
                {"kind": "passthrough", "column": "x"}
            ],
            "classifier": {"kind": "logistic", "coef": [[1.0, 1.0]], "intercept": [0.0]}
        });
        assert!(Pipeline::from_json_str(&dup.to_string()).is_err());

        let zero_scale = json!({
            "features": [{"kind": "standard", "column": "x", "mean": 0.0, "scale": 0.0}],
            "classifier": {"kind": "logistic", "coef": [[1.0]], "intercept": [0.0]}
        });
        assert!(Pipeline::from_json_str(&zero_scale.to_string()).is_err());

        let unknown_kind = json!({
            "features": [{"kind": "ordinal", "column": "x"}],
            "classifier": {"kind": "logistic", "coef": [[1.0]], "intercept": [0.0]}
        });
        assert!(matches!(
            Pipeline::from_json_str(&unknown_kind.to_string()),
            Err(ArtifactLoadError::Parse { .. })
        ));
    }
}
