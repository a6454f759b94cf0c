//! HTTP + WebSocket API for Ljudmonitor
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /status - Full monitor state
//! - GET /snapshot - Latest tick output
//! - GET /history - Level history, oldest first
//! - GET /sessions - Saved session summaries, newest first
//! - POST /recording/start, /recording/stop - Recording lifecycle
//! - POST /phase, /threshold, /adjustment - Threshold configuration
//! - POST /calibrate - Run ambient calibration
//! - POST /energy - Push a raw energy value (push input only)
//! - POST /sessions/reflection - Attach a note to the newest session
//! - WS /ws - Live updates

use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::core::acquisition::PushSource;
use crate::core::runtime::{LiveUpdate, MonitorHandle, MonitorStatus};
use crate::types::{
    CalibrationRecord, HistorySample, Phase, PhaseAdjustments, ReasonCode, SessionSummary, TickOutput,
};

/// App state
pub struct AppState {
    pub monitor: MonitorHandle,
    /// Present when levels arrive over HTTP
    pub push: Option<PushSource>,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(reason: ReasonCode) -> StatusCode {
    match reason {
        ReasonCode::M102_ALREADY_RECORDING
        | ReasonCode::M103_NOT_RECORDING
        | ReasonCode::M401_CALIBRATION_CANCELLED
        | ReasonCode::M402_CALIBRATION_IN_PROGRESS => StatusCode::CONFLICT,
        ReasonCode::M300_INVALID_CONFIGURATION
        | ReasonCode::M301_INVALID_THRESHOLD
        | ReasonCode::M302_UNKNOWN_PHASE
        | ReasonCode::M303_PHASE_NOT_ADJUSTABLE
        | ReasonCode::M305_INVALID_COMMAND => StatusCode::BAD_REQUEST,
        ReasonCode::M200_ACQUISITION_UNAVAILABLE => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(reason: ReasonCode) -> ApiError {
    (
        status_for(reason),
        Json(ErrorResponse {
            code: reason.code().to_string(),
            message: reason.description().to_string(),
        }),
    )
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub recording: bool,
}

/// Reason-only acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub code: String,
}

/// Stop response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub summary: Option<SessionSummary>,
    pub best_streak_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PhaseRequest {
    pub phase: String,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub phase: String,
    pub offset: i32,
}

#[derive(Debug, Deserialize)]
pub struct EnergyRequest {
    pub raw: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReflectionRequest {
    pub text: String,
}

/// Threshold response (phase, threshold commands)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdResponse {
    pub phase: Phase,
    pub effective_threshold: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReflectionResponse {
    pub stored: bool,
}

/// Create the API router
pub fn create_router(monitor: MonitorHandle, push: Option<PushSource>) -> Router {
    let state = Arc::new(AppState { monitor, push });

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/snapshot", get(snapshot))
        .route("/history", get(history))
        .route("/sessions", get(sessions))
        .route("/recording/start", post(start_recording))
        .route("/recording/stop", post(stop_recording))
        .route("/phase", post(set_phase))
        .route("/threshold", post(set_threshold))
        .route("/adjustment", post(set_adjustment))
        .route("/calibrate", post(calibrate))
        .route("/energy", post(push_energy))
        .route("/sessions/reflection", post(add_reflection))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        recording: state.monitor.is_recording().await,
    })
}

async fn status(State(state): State<Arc<AppState>>) -> Json<MonitorStatus> {
    Json(state.monitor.status().await)
}

/// Latest tick; 404 until the first sample of a recording
async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Json<TickOutput>, StatusCode> {
    state.monitor.snapshot().await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn history(State(state): State<Arc<AppState>>) -> Json<Vec<HistorySample>> {
    Json(state.monitor.history().await)
}

async fn sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.monitor.sessions())
}

async fn start_recording(State(state): State<Arc<AppState>>) -> ApiResult<AckResponse> {
    state.monitor.start().await.map_err(reject)?;
    Ok(Json(AckResponse {
        code: ReasonCode::M100_RECORDING_STARTED.code().to_string(),
    }))
}

async fn stop_recording(State(state): State<Arc<AppState>>) -> ApiResult<StopResponse> {
    let outcome = state.monitor.stop().await.map_err(reject)?;
    Ok(Json(StopResponse {
        summary: outcome.summary,
        best_streak_ms: outcome.best_streak_ms,
    }))
}

async fn set_phase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PhaseRequest>,
) -> ApiResult<ThresholdResponse> {
    let phase: Phase = req.phase.parse().map_err(reject)?;
    let effective_threshold = state.monitor.set_phase(phase).await;
    Ok(Json(ThresholdResponse { phase, effective_threshold }))
}

async fn set_threshold(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ThresholdRequest>,
) -> ApiResult<ThresholdResponse> {
    let effective_threshold = state.monitor.set_threshold(req.value).await.map_err(reject)?;
    let phase = state.monitor.status().await.phase;
    Ok(Json(ThresholdResponse { phase, effective_threshold }))
}

async fn set_adjustment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustmentRequest>,
) -> ApiResult<PhaseAdjustments> {
    let phase: Phase = req.phase.parse().map_err(reject)?;
    let adjustments = state
        .monitor
        .set_adjustment(phase, req.offset)
        .await
        .map_err(reject)?;
    Ok(Json(adjustments))
}

async fn calibrate(State(state): State<Arc<AppState>>) -> ApiResult<CalibrationRecord> {
    state.monitor.calibrate().await.map(Json).map_err(reject)
}

async fn push_energy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnergyRequest>,
) -> Result<StatusCode, ApiError> {
    let push = state
        .push
        .as_ref()
        .ok_or_else(|| reject(ReasonCode::M200_ACQUISITION_UNAVAILABLE))?;
    push.push(req.raw);
    Ok(StatusCode::NO_CONTENT)
}

async fn add_reflection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReflectionRequest>,
) -> ApiResult<ReflectionResponse> {
    let stored = state.monitor.add_reflection(&req.text).map_err(reject)?;
    Ok(Json(ReflectionResponse { stored }))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.monitor.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward updates until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<LiveUpdate>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(update) => {
                    let json = serde_json::to_string(&update).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!("ws client lagged, {} updates skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Run the API server
pub async fn run_server(addr: &str, monitor: MonitorHandle, push: Option<PushSource>) -> anyhow::Result<()> {
    let router = create_router(monitor, push);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", addr);
    println!("🔊 Ljudmonitor API running on {}", addr);
    println!("  GET  /status             - Monitor state");
    println!("  GET  /snapshot           - Latest level");
    println!("  GET  /history            - Level history");
    println!("  GET  /sessions           - Saved sessions");
    println!("  POST /recording/start    - Start recording");
    println!("  POST /recording/stop     - Stop recording");
    println!("  POST /phase              - Switch phase");
    println!("  POST /calibrate          - Calibrate to the room");
    println!("  WS   /ws                 - Live updates");
    println!("  GET  /health             - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MonitorConfig;
    use crate::core::store::{SessionStore, SettingsStore};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let push = PushSource::new();
        let monitor = MonitorHandle::new(
            MonitorConfig::default(),
            Box::new(push.clone()),
            Arc::new(SettingsStore::in_dir(dir.path()).unwrap()),
            Arc::new(SessionStore::in_dir(dir.path()).unwrap()),
        );
        (create_router(monitor, Some(push)), dir)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = router();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_snapshot_404_when_idle() {
        let (app, _dir) = router();
        let response = app
            .oneshot(Request::builder().uri("/snapshot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stop_without_recording_conflicts() {
        let (app, _dir) = router();
        let response = app.oneshot(post_json("/recording/stop", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_phase_rejected() {
        let (app, _dir) = router();
        let response = app
            .oneshot(post_json("/phase", r#"{"phase":"recess"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_energy_accepted() {
        let (app, _dir) = router();
        let response = app
            .oneshot(post_json("/energy", r#"{"raw":0.01}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
