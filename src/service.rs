//! HTTP inference service.
//!
//! The service starts **Unloaded** and becomes **Ready** exactly once, when
//! [`AppState::load`] succeeds. Loaded artifacts are never mutated, so request
//! handlers read them without locking.

use std::sync::{Arc, OnceLock};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::artifacts::{self, ArtifactPaths, Artifacts};
use crate::dataset::Label;
use crate::error::Result;
use crate::model::ScoreStrategy;

/// Loaded artifacts plus the score strategy chosen for the loaded model.
#[derive(Debug)]
pub struct Predictor {
    artifacts: Artifacts,
    strategy: ScoreStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub score: Option<f64>,
}

impl Predictor {
    pub fn new(artifacts: Artifacts) -> Self {
        let strategy = artifacts.model().score_strategy();
        Self { artifacts, strategy }
    }

    pub fn strategy(&self) -> ScoreStrategy {
        self.strategy
    }

    pub fn model_name(&self) -> &'static str {
        self.artifacts.model().name()
    }

    pub fn predict(&self, text: &str) -> Prediction {
        let x = self.artifacts.vectorizer().transform(text.trim());
        let x = x.view();
        let model = self.artifacts.model();
        Prediction {
            label: model.predict(&x),
            score: model.score(self.strategy, &x),
        }
    }
}

/// Shared service state.
#[derive(Debug, Default)]
pub struct AppState {
    predictor: OnceLock<Predictor>,
}

impl AppState {
    pub fn unloaded() -> Self {
        Self::default()
    }

    pub fn ready(predictor: Predictor) -> Self {
        let state = Self::default();
        let _ = state.predictor.set(predictor);
        state
    }

    /// Loads both artifacts and moves the state to Ready. On error the state
    /// stays Unloaded; nothing is partially installed.
    pub fn load(&self, paths: &ArtifactPaths) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }
        let predictor = Predictor::new(artifacts::load(paths)?);
        info!(
            "✅ Ready: {} ({:?} scores)",
            predictor.model_name(),
            predictor.strategy()
        );
        let _ = self.predictor.set(predictor);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.predictor.get().is_some()
    }

    pub fn predictor(&self) -> Option<&Predictor> {
        self.predictor.get()
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub label: String,
    pub score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: &'static str,
}

/// Request-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    EmptyText,
    NotLoaded,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::EmptyText => (StatusCode::BAD_REQUEST, "text must not be empty"),
            ApiError::NotLoaded => (StatusCode::SERVICE_UNAVAILABLE, "Model not loaded yet"),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Server listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET / - always ok, whether or not artifacts are loaded
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /predict
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyText);
    }
    let predictor = state.predictor().ok_or(ApiError::NotLoaded)?;

    let prediction = predictor.predict(text);
    debug!("Predicted {} (score={:?})", prediction.label, prediction.score);
    Ok(Json(PredictResponse {
        label: prediction.label.to_string(),
        score: prediction.score,
    }))
}
