use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use hamspam::{
    AppState, ArtifactPaths, Artifacts, Error, Predictor, ScoreStrategy, TfidfVectorizer, TrainOptions,
    artifacts, dataset, service, trainer,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SPAMMY: &str = "Free entry! Win a prize now";

fn trained_state() -> Arc<AppState> {
    let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("train/sms_spam_sample.csv");
    let corpus = dataset::read_csv(&sample).unwrap();
    let report = trainer::train(&corpus, &TrainOptions::default()).unwrap();
    let artifacts = Artifacts::new(report.vectorizer, report.model).unwrap();
    Arc::new(AppState::ready(Predictor::new(artifacts)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn health_request() -> Request<Body> {
    Request::builder().uri("/").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_is_ok_in_every_state() {
    for state in [Arc::new(AppState::unloaded()), trained_state()] {
        let (status, body) = send(service::router(state), health_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }
}

#[tokio::test]
async fn test_predict_before_load_is_unavailable() {
    let app = service::router(Arc::new(AppState::unloaded()));
    let (status, body) = send(app, predict_request(json!({"text": SPAMMY}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Model not loaded yet");
}

#[tokio::test]
async fn test_empty_text_is_bad_request_before_and_after_load() {
    for state in [Arc::new(AppState::unloaded()), trained_state()] {
        for text in ["", "   \t\n"] {
            let app = service::router(state.clone());
            let (status, body) = send(app, predict_request(json!({"text": text}))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["detail"], "text must not be empty");
        }
    }
}

#[tokio::test]
async fn test_missing_text_field_is_rejected() {
    let app = service::router(trained_state());
    let (status, _) = send(app, predict_request(json!({"message": SPAMMY}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_predict_after_training() {
    let state = trained_state();
    let strategy = state.predictor().unwrap().strategy();
    let app = service::router(state);

    let (status, body) = send(app, predict_request(json!({"text": SPAMMY}))).await;
    assert_eq!(status, StatusCode::OK);

    let label = body["label"].as_str().unwrap();
    assert!(label == "spam" || label == "ham");

    match strategy {
        ScoreStrategy::Probability => {
            let score = body["score"].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&score));
        }
        ScoreStrategy::Margin => {
            let score = body["score"].as_f64().unwrap();
            assert!(score > 0.0 && score < 1.0);
        }
        ScoreStrategy::None => assert!(body["score"].is_null()),
    }
}

#[tokio::test]
async fn test_obvious_messages_are_classified() {
    let state = trained_state();
    let predictor = state.predictor().unwrap();
    assert_eq!(
        predictor.predict("WINNER! Claim your free cash prize now, call 09061701461").label,
        hamspam::Label::Spam
    );
    assert_eq!(
        predictor.predict("Are we still on for lunch tomorrow?").label,
        hamspam::Label::Ham
    );
}

#[tokio::test]
async fn test_mismatched_artifacts_keep_service_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths {
        vectorizer: dir.path().join("vectorizer.msgpack"),
        model: dir.path().join("model.msgpack"),
    };

    let docs = ["win a free prize", "free cash now", "see you at lunch", "lunch at noon"];
    let labels = [hamspam::Label::Spam, hamspam::Label::Spam, hamspam::Label::Ham, hamspam::Label::Ham];
    let small = TfidfVectorizer::fit(&docs).unwrap();
    let model = hamspam::ModelKind::Logistic
        .fit(&small.transform_all(&docs), &labels, 42)
        .unwrap();
    artifacts::save(&paths, &small, &model).unwrap();

    // A newer vectorizer written next to the old model.
    let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("train/sms_spam_sample.csv");
    let report = trainer::train(&dataset::read_csv(&sample).unwrap(), &TrainOptions::default()).unwrap();
    let newer = report.vectorizer;
    assert_ne!(newer.n_features(), model.n_features());
    std::fs::write(&paths.vectorizer, rmp_serde::to_vec_named(&newer).unwrap()).unwrap();

    let state = Arc::new(AppState::unloaded());
    assert!(matches!(state.load(&paths), Err(Error::ArtifactMismatch { .. })));
    assert!(!state.is_ready());

    let (status, _) = send(service::router(state), predict_request(json!({"text": SPAMMY}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
