//! # API REST
//!
//! REST API implementation for rxcheck.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Uses `api-shared` for common types and utilities.

#![warn(rust_2018_idioms)]

use api_shared::{AnalyzeReq, ErrorRes, HealthRes, HealthService, PdfRes, RootRes, SearchQuery};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rxcheck_core::analysis::{prepare_report, ReportInput};
use rxcheck_core::{AnalysisOutcome, AnalysisService, MedicineIndex};
use rxcheck_report::{render_report, REPORT_FILENAME};
use rxcheck_types::{AnalysisFailure, MedicineHit, PrescriptionAnalysis, PrescriptionText};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::Instrument;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, Json<ErrorRes>);

/// Application state for the REST API server
///
/// Both members are built once at startup and never mutated, so handlers share them without
/// locking.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub medicines: Arc<MedicineIndex>,
}

impl AppState {
    pub fn new(analysis: AnalysisService, medicines: MedicineIndex) -> Self {
        Self {
            analysis: Arc::new(analysis),
            medicines: Arc::new(medicines),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(root, health, search_medicines, analyze_prescription, generate_pdf),
    components(schemas(
        RootRes,
        HealthRes,
        AnalyzeReq,
        PdfRes,
        ErrorRes,
        MedicineHit,
        PrescriptionAnalysis,
        AnalysisFailure,
        rxcheck_types::MedicineRecord,
        rxcheck_types::Evaluation,
        rxcheck_types::Ambiguity,
        rxcheck_types::OverallRating,
    ))
)]
pub struct ApiDoc;

/// Build the full HTTP router, including Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/medicines/search", get(search_medicines))
        .route("/api/analyze-prescription", post(analyze_prescription))
        .route("/api/generate-pdf", post(generate_pdf))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Liveness message", body = RootRes)
    )
)]
#[axum::debug_handler]
async fn root() -> Json<RootRes> {
    Json(HealthService::root())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/medicines/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching medicines, at most 20", body = [MedicineHit])
    )
)]
/// Search the medicine dataset by name
///
/// Case-insensitive substring match. A missing or one-character `q` returns an empty list, as
/// does a server whose dataset could not be loaded.
#[axum::debug_handler]
async fn search_medicines(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<MedicineHit>> {
    let q = query.q.unwrap_or_default();
    Json(state.medicines.search(&q))
}

#[utoipa::path(
    post,
    path = "/api/analyze-prescription",
    request_body = AnalyzeReq,
    responses(
        (status = 200, description = "Analysis, or an error envelope with `error: true`", body = PrescriptionAnalysis),
        (status = 400, description = "Body unreadable, or prescription text missing, too short or too long", body = ErrorRes)
    )
)]
/// Analyse raw prescription text with the external model
///
/// Provider and model-output failures are reported in-band as an `AnalysisFailure` envelope
/// with status 200; only invalid input is rejected with 400.
#[axum::debug_handler]
async fn analyze_prescription(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;
    let text = PrescriptionText::new(req.text).map_err(|e| {
        tracing::info!("Rejected prescription text: {}", e);
        (StatusCode::BAD_REQUEST, Json(ErrorRes::new(e.to_string())))
    })?;

    let span = tracing::info_span!("analyze", request_id = %uuid::Uuid::new_v4());
    let outcome = state
        .analysis
        .analyze_or_failure(&text)
        .instrument(span)
        .await;

    Ok(match outcome {
        AnalysisOutcome::Completed(analysis) => Json(analysis).into_response(),
        AnalysisOutcome::Failed(failure) => Json(failure).into_response(),
    })
}

#[utoipa::path(
    post,
    path = "/api/generate-pdf",
    request_body = PrescriptionAnalysis,
    responses(
        (status = 200, description = "Rendered report", body = PdfRes),
        (status = 400, description = "Body unreadable or not a JSON object", body = ErrorRes),
        (status = 500, description = "Report rendering failed", body = ErrorRes)
    )
)]
/// Render an analysis (or an error envelope) as a PDF report
///
/// The body goes through the same lenient normalisation as model output, so partial objects
/// render with defaults. The PDF is returned base64-encoded.
#[axum::debug_handler]
async fn generate_pdf(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PdfRes>, ApiError> {
    let Json(body) = payload.map_err(bad_body)?;
    let ReportInput { analysis, notice } = prepare_report(&body).map_err(|e| {
        tracing::info!("Rejected report body: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorRes::new("Report body must be a JSON object")),
        )
    })?;

    let rendered =
        tokio::task::spawn_blocking(move || render_report(&analysis, notice.as_deref())).await;

    match rendered {
        Ok(Ok(bytes)) => Ok(Json(PdfRes {
            pdf_base64: STANDARD.encode(bytes),
            filename: REPORT_FILENAME.into(),
        })),
        Ok(Err(e)) => {
            tracing::error!("Render report error: {:?}", e);
            Err(internal_error(format!("Error generating PDF: {e}")))
        }
        Err(e) => {
            tracing::error!("Render task error: {:?}", e);
            Err(internal_error("Error generating PDF".to_string()))
        }
    }
}

/// Unreadable JSON bodies get the same `{detail}` shape as every other client error.
fn bad_body(rejection: JsonRejection) -> ApiError {
    tracing::info!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorRes::new(rejection.body_text())),
    )
}

fn internal_error(detail: String) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorRes::new(detail)))
}
