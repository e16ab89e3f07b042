use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use placement_engine::placement::{placement_router, Notifier, PlacementEngine};
use placement_engine::store::DocumentStore;
use serde_json::json;
use std::sync::Arc;

/// Engine routes plus the operational endpoints.
pub(crate) fn with_service_routes<S, N>(engine: Arc<PlacementEngine<S, N>>) -> axum::Router
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    placement_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{seed_demo_store, LoggingNotifier, DEMO_CYCLE, DEMO_JOB_PLATFORM, DEMO_STUDENTS};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use placement_engine::config::EngineConfig;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn router(state: AppState) -> axum::Router {
        let store = Arc::new(seed_demo_store().expect("demo store"));
        let engine = PlacementEngine::new(
            store,
            Arc::new(LoggingNotifier::default()),
            EngineConfig::default(),
        );
        with_service_routes(Arc::new(engine)).layer(Extension(state))
    }

    async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flagged() {
        let flagged = state(false);
        let router = router(flagged.clone());

        let (status, body) = get(&router, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        flagged.readiness.store(true, Ordering::Release);
        let (status, body) = get(&router, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn health_and_engine_routes_share_one_router() {
        let router = router(state(true));

        let (status, body) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, statistics) =
            get(&router, &format!("/api/v1/cycles/{DEMO_CYCLE}/statistics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(statistics["totalJobs"], 3);
        assert_eq!(statistics["totalSelected"], 2);

        let (status, decision) = get(
            &router,
            &format!("/api/v1/eligibility/{DEMO_JOB_PLATFORM}/{}", DEMO_STUDENTS[4]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decision["eligible"], false);
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        let response = metrics_endpoint(Extension(state(true))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
