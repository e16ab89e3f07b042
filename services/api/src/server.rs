use crate::cli::ServeArgs;
use crate::infra::{load_snapshot, seed_demo_store, AppState, LoggingNotifier};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_engine::config::AppConfig;
use placement_engine::error::AppError;
use placement_engine::placement::PlacementEngine;
use placement_engine::store::MemoryStore;
use placement_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = match (&args.data, args.empty) {
        (Some(path), _) => load_snapshot(path)?,
        (None, true) => MemoryStore::new(),
        (None, false) => seed_demo_store()?,
    };
    let engine = Arc::new(PlacementEngine::new(
        Arc::new(store),
        Arc::new(LoggingNotifier::default()),
        config.engine.clone(),
    ));

    let app = with_service_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        placed_scope = ?config.engine.eligibility.placed_scope,
        %addr,
        "placement engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
