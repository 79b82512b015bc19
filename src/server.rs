use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::SchemaMismatchError;
use crate::service::Predictor;
use crate::types::{FeatureRecord, FieldSpec, PredictionResult};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub log_predictions: bool,
}

impl AppState {
    pub fn new(predictor: Predictor, log_predictions: bool) -> Self {
        Self {
            predictor: Arc::new(predictor),
            log_predictions,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schema", get(schema))
        .route("/predict", post(predict))
        .with_state(state)
}

// ---------- Response types ----------

pub type ApiError = (StatusCode, Json<Value>);

#[derive(Serialize)]
pub struct SchemaOut {
    pub fields: Vec<FieldSpec>,
    pub classes: Vec<String>,
}

fn schema_mismatch(err: &SchemaMismatchError) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "error": err.to_string(),
            "kind": "schema_mismatch",
            "field": err.field(),
        })),
    )
}

/// Bodies that never reach the record boundary. Valid JSON of the wrong
/// shape is a schema mismatch; unparseable bodies keep the extractor's status.
fn rejected_body(rejection: &JsonRejection) -> ApiError {
    let (status, kind) = match rejection {
        JsonRejection::JsonDataError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "schema_mismatch"),
        JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
        other => (other.status(), "invalid_request"),
    };
    (
        status,
        Json(json!({
            "error": rejection.body_text(),
            "kind": kind,
            "field": Value::Null,
        })),
    )
}

// ---------- Handlers ----------

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn schema(State(state): State<AppState>) -> Json<SchemaOut> {
    Json(SchemaOut {
        fields: FeatureRecord::schema(),
        classes: state.predictor.classes().to_vec(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!("rejected body: {e}");
        rejected_body(&e)
    })?;
    let record = FeatureRecord::from_map(&payload).map_err(|e| {
        tracing::debug!("rejected record: {e}");
        schema_mismatch(&e)
    })?;

    let result = state.predictor.predict(&record).map_err(|e| {
        tracing::warn!("pipeline rejected record: {e}");
        schema_mismatch(&e)
    })?;

    if state.log_predictions {
        let top = result.top().map_or(0.0, |p| p.percent);
        tracing::info!(
            "predict gender={} age={} height={:.2} weight={:.1} -> {} ({:.2}%)",
            record.gender,
            record.age,
            record.height,
            record.weight,
            result.label,
            top
        );
    }

    Ok(Json(result))
}
