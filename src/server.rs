//! HTTP control surface for the scheduler.
//!
//! | Route | Effect |
//! |---|---|
//! | `GET /api/schedule` | persisted schedule |
//! | `POST /api/schedule` | replace the job and persist |
//! | `POST /api/run-now` | one pipeline run, immediately |
//!
//! Every mutating route answers with a `{"status": "success" | "error", ...}`
//! envelope.

use crate::models::{ScheduleConfig, ScheduleSpec};
use crate::pipeline::RunPipeline;
use crate::scheduler::ScheduleService;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

type Envelope = (StatusCode, Json<Value>);

pub fn router<R: RunPipeline>(service: Arc<ScheduleService<R>>) -> Router {
    Router::new()
        .route(
            "/api/schedule",
            get(get_schedule::<R>).post(set_schedule::<R>),
        )
        .route("/api/run-now", post(run_now::<R>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Read a schedule update.
///
/// Accepts the persisted shape `{"enabled", "schedule": {...}}` as well as
/// the flat form `{"enabled", "type", "hours", "day_of_week", "hour", "minute"}`.
pub fn parse_schedule_request(body: Value) -> Result<ScheduleConfig, serde_json::Error> {
    let enabled = match body.get("enabled") {
        None | Some(Value::Null) => false,
        Some(v) => serde_json::from_value(v.clone())?,
    };
    let schedule: ScheduleSpec = match body.get("schedule") {
        Some(nested @ Value::Object(_)) => serde_json::from_value(nested.clone())?,
        _ => serde_json::from_value(body)?,
    };
    Ok(ScheduleConfig { enabled, schedule })
}

fn error_envelope(status: StatusCode, message: impl ToString) -> Envelope {
    (
        status,
        Json(json!({"status": "error", "message": message.to_string()})),
    )
}

async fn get_schedule<R: RunPipeline>(
    State(service): State<Arc<ScheduleService<R>>>,
) -> Json<ScheduleConfig> {
    Json(service.get_schedule().await)
}

async fn set_schedule<R: RunPipeline>(
    State(service): State<Arc<ScheduleService<R>>>,
    Json(body): Json<Value>,
) -> Envelope {
    let config = match parse_schedule_request(body) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Malformed schedule request");
            return error_envelope(StatusCode::BAD_REQUEST, e);
        }
    };

    match service.set_schedule(config).await {
        Ok(schedule) => {
            info!(enabled = schedule.enabled, "Schedule updated");
            (
                StatusCode::OK,
                Json(json!({"status": "success", "schedule": schedule})),
            )
        }
        Err(e) => {
            error!(error = %e, "Rejected schedule");
            error_envelope(StatusCode::BAD_REQUEST, e)
        }
    }
}

async fn run_now<R: RunPipeline>(State(service): State<Arc<ScheduleService<R>>>) -> Envelope {
    match service.run_now().await {
        Ok(path) => (
            StatusCode::OK,
            Json(json!({"status": "success", "path": path.display().to_string()})),
        ),
        Err(e) => error_envelope(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::testing::{ScriptedModel, StaticSource, sample_stories};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    type TestPipeline = Pipeline<StaticSource, ScriptedModel>;

    fn app(dir: &tempfile::TempDir, pipeline: TestPipeline) -> Router {
        let service = ScheduleService::new(dir.path().join("schedule.json"), Arc::new(pipeline));
        router(Arc::new(service))
    }

    fn idle_pipeline(dir: &tempfile::TempDir) -> TestPipeline {
        Pipeline::new(
            StaticSource::new(Vec::new()),
            ScriptedModel::default(),
            dir.path().join("posts"),
        )
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_get_schedule_defaults_to_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (status, body) = send(&app, get("/api/schedule")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"enabled": false, "schedule": {}}));
    }

    #[tokio::test]
    async fn test_post_flat_schedule_then_get() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (status, body) = send(
            &app,
            post_json(
                "/api/schedule",
                json!({"enabled": true, "type": "cron", "day_of_week": "mon-fri", "hour": "9", "minute": 30}),
            ),
        )
        .await;
        let expected = json!({
            "enabled": true,
            "schedule": {"type": "cron", "day_of_week": "mon-fri", "hour": 9, "minute": 30}
        });
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "schedule": expected}));

        let (_, body) = send(&app, get("/api/schedule")).await;
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn test_post_nested_schedule() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (status, body) = send(
            &app,
            post_json(
                "/api/schedule",
                json!({"enabled": true, "schedule": {"type": "interval", "hours": 6}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["schedule"],
            json!({"enabled": true, "schedule": {"type": "interval", "hours": 6}})
        );
    }

    #[tokio::test]
    async fn test_post_disable() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (_, body) = send(&app, post_json("/api/schedule", json!({"enabled": false}))).await;
        assert_eq!(
            body,
            json!({"status": "success", "schedule": {"enabled": false, "schedule": {}}})
        );
    }

    #[tokio::test]
    async fn test_post_invalid_schedule_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (status, body) = send(
            &app,
            post_json("/api/schedule", json!({"enabled": true, "type": "interval", "hours": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) = send(
            &app,
            post_json("/api/schedule", json!({"enabled": true, "type": "weekly"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (_, body) = send(&app, get("/api/schedule")).await;
        assert_eq!(body, json!({"enabled": false, "schedule": {}}));
    }

    #[tokio::test]
    async fn test_run_now_success() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            StaticSource::new(sample_stories()),
            ScriptedModel::answering([r#"{"selected_index": 0, "reason": "r"}"#, "# Post\n\nBody."]),
            tmp.path().join("posts"),
        );
        let app = app(&tmp, pipeline);

        let (status, body) = send(&app, post_json("/api/run-now", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let path = body["path"].as_str().unwrap();
        assert!(path.ends_with("-Story-0.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Post\n\nBody.");
    }

    #[tokio::test]
    async fn test_run_now_failure_envelope() {
        let tmp = tempfile::tempdir().unwrap();
        let app = app(&tmp, idle_pipeline(&tmp));

        let (status, body) = send(&app, post_json("/api/run-now", json!({}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"status": "error", "message": "no stories"}));
    }

    #[test]
    fn test_parse_schedule_request_forms() {
        let flat = parse_schedule_request(json!({"enabled": true, "type": "interval", "hours": "12"}))
            .unwrap();
        assert_eq!(flat, ScheduleConfig::enabled(ScheduleSpec::interval(12)));

        let nested = parse_schedule_request(
            json!({"enabled": true, "schedule": {"type": "interval", "hours": 12}}),
        )
        .unwrap();
        assert_eq!(nested, flat);

        let empty = parse_schedule_request(json!({})).unwrap();
        assert_eq!(empty, ScheduleConfig::disabled());
    }
}
