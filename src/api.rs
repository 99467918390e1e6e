//! REST API Server for the daily report pipeline
//!
//! Exposes report generation over HTTP

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::error::ReportError;
use crate::pipeline::{today_kst, DailyReportPipeline};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Prompt,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReportRequest {
    /// YYYY-MM-DD; today (KST) when omitted
    pub date: Option<String>,
    #[serde(default)]
    pub cues: Vec<String>,
    pub base_snapshot: Option<Value>,
    #[serde(default)]
    pub format: ReportFormat,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

/// One pipeline, with its pooled HTTP clients, shared by every request
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<DailyReportPipeline>,
}

/// Upstream provider failures are a bad gateway; everything else is ours.
/// Tool args come from the compiled plan, never from the caller.
fn status_for(err: &ReportError) -> StatusCode {
    match err {
        ReportError::ToolError(_) | ReportError::HttpError(_) | ReportError::LlmError(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, String> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| format!("date must be YYYY-MM-DD, got {}", value)),
        None => Ok(today_kst()),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Report Endpoint
/// =============================

async fn report_handler(
    State(state): State<ApiState>,
    Json(req): Json<ReportRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let target_date = match parse_date(req.date.as_deref()) {
        Ok(date) => date,
        Err(message) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))),
    };

    info!(
        date = %target_date,
        cues = ?req.cues,
        format = ?req.format,
        "Received report request"
    );

    let pipeline = &state.pipeline;

    match pipeline
        .run(target_date, &req.cues, req.base_snapshot.as_ref())
        .await
    {
        Ok(output) => {
            let data = match req.format {
                ReportFormat::Text => json!({
                    "type": "text",
                    "date": output.date,
                    "report": output.to_text(),
                    "metadata": output.metadata,
                }),
                ReportFormat::Prompt => json!({
                    "type": "prompt",
                    "date": output.date,
                    "prompt": pipeline.build_llm_prompt(&output.raw_data),
                    "metadata": output.metadata,
                }),
                ReportFormat::Json => json!({
                    "type": "json",
                    "report": output,
                }),
            };
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Err(e) => {
            error!("Report run failed: {}", e);
            (
                status_for(&e),
                Json(ApiResponse::error(format!("Report generation failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<DailyReportPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/report", post(report_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<DailyReportPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
