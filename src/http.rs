//! HTTP transport module for symptom-insight
//!
//! Axum server exposing prediction, feedback and the symptom vocabulary.
//! Health, info, and metrics are plain JSON.

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::{InsightError, Result};
use crate::feedback::{FeedbackOutcome, FeedbackSink};
use crate::pipeline::DiagnosisPipeline;
use crate::result::EnrichedResult;

const LATENCY_WINDOW: usize = 256;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub pipeline: DiagnosisPipeline,
    pub feedback: Arc<FeedbackSink>,
    pub require_symptoms: bool,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

impl HttpState {
    pub fn new(pipeline: DiagnosisPipeline, feedback: FeedbackSink, require_symptoms: bool) -> Self {
        Self {
            pipeline,
            feedback: Arc::new(feedback),
            require_symptoms,
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    pub diseases_count: std::collections::HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: unix_now(),
            errors_total: 0,
            latencies: Vec::with_capacity(LATENCY_WINDOW),
            diseases_count: std::collections::HashMap::new(),
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IgnoredSymptom {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: EnrichedResult,
    pub ignored_symptoms: Vec<IgnoredSymptom>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub text: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let artifacts = state.pipeline.artifacts();
    Json(json!({
        "model": {
            "symptoms": artifacts.vocabulary().len(),
            "classes": artifacts.labels().len(),
            "fingerprint": artifacts.fingerprint()
        },
        "knowledge_base": {
            "diseases": state.pipeline.knowledge().len()
        },
        "search": {
            "enabled": state.pipeline.search().provider_name() != "disabled",
            "provider": state.pipeline.search().provider_name()
        },
        "feedback": {
            "path": state.feedback.path().display().to_string()
        },
        "server": {
            "require_symptoms": state.require_symptoms
        }
    }))
}

/// Vocabulary endpoint; the UI's selectable choices
pub async fn symptoms_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(state.pipeline.artifacts().vocabulary().names().to_vec())
}

/// Prediction endpoint
pub async fn predict_handler(
    State(state): State<HttpState>,
    Json(request): Json<PredictRequest>,
) -> Result<axum::response::Response> {
    let selection: BTreeSet<String> = request
        .symptoms
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let vocabulary = state.pipeline.artifacts().vocabulary();
    let (known, unknown) = vocabulary.partition(selection.iter().map(String::as_str));
    let ignored_symptoms: Vec<IgnoredSymptom> = unknown
        .into_iter()
        .map(|name| IgnoredSymptom {
            name: name.to_string(),
            suggestion: vocabulary.suggest(name).map(str::to_string),
        })
        .collect();

    // Unknown names encode to nothing, so only known ones count as a selection
    if known.is_empty() && state.require_symptoms {
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "declined",
                "message": "Please select at least one symptom.",
                "ignored_symptoms": ignored_symptoms
            })),
        )
            .into_response());
    }

    let result = state.pipeline.diagnose(&selection).await?;

    {
        let mut m = state.metrics.lock().await;
        *m.diseases_count
            .entry(result.prediction.disease_label.clone())
            .or_insert(0) += 1;
    }

    Ok(Json(PredictResponse {
        result,
        ignored_symptoms,
    })
    .into_response())
}

/// Feedback endpoint
pub async fn feedback_handler(
    State(state): State<HttpState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<axum::response::Response> {
    let sink = state.feedback.clone();
    let outcome = tokio::task::spawn_blocking(move || sink.submit(&request.text))
        .await
        .map_err(|e| InsightError::Internal {
            message: format!("feedback task failed: {}", e),
        })?;

    let status = match outcome {
        FeedbackOutcome::Accepted { .. } => StatusCode::OK,
        FeedbackOutcome::Declined { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FeedbackOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut body = serde_json::to_value(&outcome)?;
    body["accepted"] = json!(outcome.accepted());

    Ok((status, Json(body)).into_response())
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    // Compute latency stats
    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    };

    // Top 5 predicted diseases
    let mut diseases: Vec<_> = metrics.diseases_count.iter().collect();
    diseases.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let diseases_top_5: Vec<_> = diseases
        .into_iter()
        .take(5)
        .map(|(k, v)| json!({ "name": k, "count": v }))
        .collect();

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "last_request_unix": metrics.last_request_unix,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
        "diseases_top_5": diseases_top_5
    }))
}

/// Build the router with CORS and request metrics
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/symptoms", get(symptoms_handler))
        .route("/predict", post(predict_handler))
        .route("/feedback", post(feedback_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let tracked = matches!(req.uri().path(), "/predict" | "/feedback");
                let start = std::time::Instant::now();
                let resp = next.run(req).await;
                if tracked {
                    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let mut m = metrics.lock().await;
                    m.latencies.push(latency_ms);
                    if m.latencies.len() > LATENCY_WINDOW {
                        m.latencies.remove(0);
                    }
                    if resp.status().is_server_error() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_requests = m.total_requests.saturating_add(1);
                    m.last_request_unix = unix_now();
                }
                resp
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: &Config, pipeline: DiagnosisPipeline) -> anyhow::Result<()> {
    let state = HttpState::new(
        pipeline,
        FeedbackSink::from_config(&config.feedback),
        config.server.require_symptoms,
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", config.server.bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
