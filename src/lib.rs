//! Obesity level prediction service.
//!
//! Loads a fitted preprocessing + classification pipeline and its label
//! encoder once, then answers one prediction per 16-field [`FeatureRecord`].

pub mod config;
pub mod encoder;
pub mod error;
pub mod model;
pub mod server;
pub mod service;
pub mod types;

pub use error::{ArtifactLoadError, SchemaMismatchError};
pub use service::Predictor;
pub use types::{FeatureRecord, PredictionResult};
