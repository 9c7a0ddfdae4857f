//! HTTP adapter.
//!
//! Thin route layer over the session and the metrics poller. Every handler
//! answers HTTP 200 with a `success` boolean; failures are data in the body,
//! never status codes. Body defaults match the original control UI.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::metrics::{MetricsPoller, VehicleMetrics};
use crate::session::{CommandOutcome, StatusReport, VehicleSession};

/// How long `/api/wait_heartbeat` holds the request
const HEARTBEAT_WAIT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<VehicleSession>,
    pub metrics: Arc<MetricsPoller>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/connect", post(connect))
        .route("/api/status", get(status))
        .route("/api/vehicle_metrics", get(vehicle_metrics))
        .route("/api/wait_heartbeat", post(wait_heartbeat))
        .route("/api/arm", post(arm))
        .route("/api/set_mode", post(set_mode))
        .route("/api/move", post(move_vehicle))
        .route("/api/set_depth", post(set_depth))
        .route("/api/set_heading", post(set_heading))
        .route("/api/set_attitude", post(set_attitude))
        .route("/api/disconnect", post(disconnect))
        .with_state(state)
}

/// Unwrap a parsed body. Rejections (missing body, bad JSON, wrong types)
/// become a failure outcome the caller reads from a 200, never an error
/// status.
fn parse<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Json<CommandOutcome>> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(e) => Err(Json(CommandOutcome::fail(format!(
            "Invalid request body: {}",
            e
        )))),
    }
}

async fn connect(State(state): State<AppState>) -> Json<CommandOutcome> {
    Json(state.session.connect().await)
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.session.status().await)
}

#[derive(Serialize)]
struct MetricsResponse {
    success: bool,
    data: VehicleMetrics,
}

async fn vehicle_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        success: true,
        data: state.metrics.poll().await,
    })
}

async fn wait_heartbeat(State(state): State<AppState>) -> Json<CommandOutcome> {
    if state.session.wait_for_heartbeat(HEARTBEAT_WAIT_SECS).await {
        Json(CommandOutcome::ok("Heartbeat received"))
    } else {
        Json(CommandOutcome::fail("Timeout waiting for heartbeat"))
    }
}

async fn arm(State(state): State<AppState>) -> Json<CommandOutcome> {
    Json(state.session.arm().await)
}

#[derive(Debug, Deserialize)]
struct SetModeRequest {
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "ALT_HOLD".into()
}

async fn set_mode(
    State(state): State<AppState>,
    body: Result<Json<SetModeRequest>, JsonRejection>,
) -> Json<CommandOutcome> {
    let req = match parse(body) {
        Ok(req) => req,
        Err(out) => return out,
    };
    Json(state.session.set_mode(&req.mode).await)
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    /// Empty means no direction matched; the move still runs with zero axes
    #[serde(default)]
    direction: String,
    #[serde(default = "default_throttle")]
    throttle: f32,
    #[serde(default = "default_duration")]
    duration: f32,
}

fn default_throttle() -> f32 {
    0.5
}

fn default_duration() -> f32 {
    1.0
}

async fn move_vehicle(
    State(state): State<AppState>,
    body: Result<Json<MoveRequest>, JsonRejection>,
) -> Json<CommandOutcome> {
    let req = match parse(body) {
        Ok(req) => req,
        Err(out) => return out,
    };
    Json(
        state
            .session
            .send_movement(&req.direction, req.throttle, req.duration)
            .await,
    )
}

#[derive(Debug, Deserialize)]
struct SetDepthRequest {
    depth: f32,
}

async fn set_depth(
    State(state): State<AppState>,
    body: Result<Json<SetDepthRequest>, JsonRejection>,
) -> Json<CommandOutcome> {
    let req = match parse(body) {
        Ok(req) => req,
        Err(out) => return out,
    };
    Json(state.session.set_depth(req.depth).await)
}

#[derive(Debug, Deserialize)]
struct SetHeadingRequest {
    heading: f32,
}

async fn set_heading(
    State(state): State<AppState>,
    body: Result<Json<SetHeadingRequest>, JsonRejection>,
) -> Json<CommandOutcome> {
    let req = match parse(body) {
        Ok(req) => req,
        Err(out) => return out,
    };
    Json(state.session.set_heading(req.heading).await)
}

#[derive(Debug, Deserialize)]
struct SetAttitudeRequest {
    #[serde(default)]
    roll: f32,
    #[serde(default)]
    pitch: f32,
    #[serde(default)]
    yaw: f32,
}

async fn set_attitude(
    State(state): State<AppState>,
    body: Result<Json<SetAttitudeRequest>, JsonRejection>,
) -> Json<CommandOutcome> {
    let req = match parse(body) {
        Ok(req) => req,
        Err(out) => return out,
    };
    Json(state.session.set_attitude(req.roll, req.pitch, req.yaw).await)
}

async fn disconnect(State(state): State<AppState>) -> Json<CommandOutcome> {
    Json(state.session.disconnect().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::VehicleSession;
    use crate::transport::LinkConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            session: Arc::new(VehicleSession::new(LinkConfig::default())),
            metrics: Arc::new(MetricsPoller::new("http://127.0.0.1:9").unwrap()),
        }
    }

    async fn post_json(path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let resp = router(test_state())
            .oneshot(
                Request::post(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_body_answers_200_with_failure() {
        let (status, body) = post_json("/api/move", "{not json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));

        let (status, body) = post_json("/api/set_depth", r#"{"depth":"deep"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn move_without_direction_is_accepted() {
        let (status, body) = post_json("/api/move", "{}").await;
        assert_eq!(status, StatusCode::OK);
        // Body parses; the session rejects it for lack of a connection
        assert_eq!(body["message"], "No connection to vehicle");
    }

    #[test]
    fn set_mode_body_defaults_to_alt_hold() {
        let req: SetModeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.mode, "ALT_HOLD");

        let req: SetModeRequest = serde_json::from_str(r#"{"mode":"MANUAL"}"#).unwrap();
        assert_eq!(req.mode, "MANUAL");
    }

    #[test]
    fn move_body_fills_throttle_and_duration() {
        let req: MoveRequest = serde_json::from_str(r#"{"direction":"forward"}"#).unwrap();
        assert_eq!(req.direction, "forward");
        assert_eq!(req.throttle, 0.5);
        assert_eq!(req.duration, 1.0);
    }

    #[test]
    fn attitude_body_defaults_angles_to_zero() {
        let req: SetAttitudeRequest = serde_json::from_str(r#"{"yaw":90.0}"#).unwrap();
        assert_eq!(req.roll, 0.0);
        assert_eq!(req.pitch, 0.0);
        assert_eq!(req.yaw, 90.0);
    }
}
