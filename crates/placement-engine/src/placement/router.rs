use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::applications::Notifier;
use super::domain::{ApplicationStatus, NewJob};
use super::engine::PlacementEngine;
use super::error::PlacementError;
use super::reports::{ExportFormat, ReportFilters};
use crate::store::DocumentStore;

type SharedEngine<S, N> = State<Arc<PlacementEngine<S, N>>>;

/// HTTP surface over the engine.
pub fn placement_router<S, N>(engine: Arc<PlacementEngine<S, N>>) -> Router
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/eligibility/:job_id/:student_id",
            get(eligibility_handler::<S, N>),
        )
        .route("/api/v1/applications", post(apply_handler::<S, N>))
        .route(
            "/api/v1/applications/:application_id/status",
            patch(status_handler::<S, N>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<S, N>),
        )
        .route("/api/v1/jobs", post(post_job_handler::<S, N>))
        .route("/api/v1/jobs/:job_id", delete(delete_job_handler::<S, N>))
        .route(
            "/api/v1/cycles/:cycle_id",
            delete(delete_cycle_handler::<S, N>),
        )
        .route(
            "/api/v1/cycles/:cycle_id/statistics",
            get(cycle_statistics_handler::<S, N>),
        )
        .route(
            "/api/v1/reports",
            post(generate_report_handler::<S, N>).get(list_reports_handler::<S, N>),
        )
        .route("/api/v1/reports/:report_id", get(report_handler::<S, N>))
        .route(
            "/api/v1/reports/:report_id/export",
            get(export_handler::<S, N>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyRequest {
    pub job_id: String,
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRequest {
    #[serde(rename = "type")]
    pub report_type: String,
    #[serde(default)]
    pub filters: ReportFilters,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

pub(crate) async fn eligibility_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path((job_id, student_id)): Path<(String, String)>,
) -> Result<Json<Value>, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let decision = engine.explain_eligibility(&job_id, &student_id)?;
    Ok(Json(json!({
        "jobId": job_id,
        "studentId": student_id,
        "eligible": decision.is_eligible(),
        "summary": decision.summary(),
        "decision": decision,
    })))
}

pub(crate) async fn apply_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Json(request): Json<ApplyRequest>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let application = engine.apply(&request.job_id, &request.student_id)?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn status_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(application_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let status = ApplicationStatus::parse(&request.status).ok_or_else(|| {
        PlacementError::Validation(format!("unknown application status '{}'", request.status))
    })?;
    let application = engine.update_status(&application_id, status, request.stage)?;
    Ok(Json(application).into_response())
}

pub(crate) async fn withdraw_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(application_id): Path<String>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let application = engine.withdraw(&application_id)?;
    Ok(Json(application).into_response())
}

pub(crate) async fn post_job_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Json(new_job): Json<NewJob>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let job = engine.post_job(new_job)?;
    Ok((StatusCode::CREATED, Json(job)).into_response())
}

pub(crate) async fn delete_job_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(job_id): Path<String>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let summary = engine.delete_job(&job_id)?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn delete_cycle_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(cycle_id): Path<String>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let summary = engine.delete_cycle(&cycle_id)?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn cycle_statistics_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(cycle_id): Path<String>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let statistics = engine.compute_cycle_statistics(&cycle_id)?;
    Ok(Json(statistics).into_response())
}

pub(crate) async fn generate_report_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Json(request): Json<ReportRequest>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let report_id = engine.generate_report(&request.report_type, request.filters)?;
    let view = engine.get_report(report_id.as_str())?;
    let payload = json!({
        "reportId": report_id,
        "status": view.status,
        "errorMessage": view.error_message,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn list_reports_handler<S, N>(
    State(engine): SharedEngine<S, N>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let reports = engine.list_reports()?;
    Ok(Json(reports).into_response())
}

pub(crate) async fn report_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(report_id): Path<String>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let view = engine.get_report(&report_id)?;
    Ok(Json(view).into_response())
}

pub(crate) async fn export_handler<S, N>(
    State(engine): SharedEngine<S, N>,
    Path(report_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, PlacementError>
where
    S: DocumentStore + 'static,
    N: Notifier + 'static,
{
    let requested = query.format.as_deref().unwrap_or("csv");
    let format = ExportFormat::parse(requested).ok_or_else(|| {
        PlacementError::Validation(format!("unsupported export format '{requested}'"))
    })?;

    let exported = engine.export_report(&report_id, format)?;
    let headers = [
        (header::CONTENT_TYPE, exported.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", exported.filename),
        ),
    ];
    Ok((headers, exported.bytes).into_response())
}
