//! HTTP route handlers.

use crate::image_proc::{DisplayReport, ImageProcessor, ProcessingError};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<ImageProcessor>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

fn err_json(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

fn processing_error(e: ProcessingError) -> (StatusCode, Json<Value>) {
    tracing::error!("Image pipeline failed: {}", e);

    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({
        "status": "error",
        "kind": e.kind(),
        "error": e.to_string(),
    });
    if let Some(device_status) = e.device_status() {
        body["status_code"] = json!(device_status);
    }

    err_json(status, body)
}

fn report_json(report: &DisplayReport) -> Value {
    let mut body = json!({
        "message": "Image processed successfully",
        "bytes": report.frame.payload.len(),
        "device_status": report.upload.status_code,
    });
    if let Some(saved) = &report.frame.artifacts {
        body["image_path"] = json!(saved.image_path);
        body["c_array_path"] = json!(saved.c_array_path);
        body["bin_path"] = json!(saved.bin_path);
    }
    body
}

/// POST /displayImage - multipart upload, field `image`
pub async fn display_image(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        err_json(StatusCode::BAD_REQUEST, json!({ "status": "error", "error": e.body_text() }))
    })? {
        if field.name() == Some(IMAGE_FIELD) {
            let data = field.bytes().await.map_err(|e| {
                err_json(StatusCode::BAD_REQUEST, json!({ "status": "error", "error": e.body_text() }))
            })?;
            image = Some(data);
            break;
        }
    }

    let Some(bytes) = image else {
        tracing::warn!("Upload missing image field");
        return Err(err_json(
            StatusCode::BAD_REQUEST,
            json!({ "status": "error", "error": "No image provided" }),
        ));
    };

    let report = state
        .processor
        .process_and_display(bytes)
        .await
        .map_err(processing_error)?;

    Ok(Json(report_json(&report)))
}

/// POST /displayImageUrl - JSON `{"url": ...}`
pub async fn display_image_url(
    State(state): State<AppState>,
    Json(body): Json<UrlRequest>,
) -> ApiResult {
    let url = body.url.unwrap_or_default();
    if url.trim().is_empty() {
        return Err(err_json(
            StatusCode::BAD_REQUEST,
            json!({ "status": "error", "error": "No url provided" }),
        ));
    }

    let report = state
        .processor
        .process_url_and_display(&url)
        .await
        .map_err(processing_error)?;

    Ok(Json(report_json(&report)))
}

/// GET /clear
pub async fn clear_display(State(state): State<AppState>) -> ApiResult {
    match state.processor.device().clear().await {
        Ok(_) => Ok(Json(json!({
            "status": "Success",
            "message": "Clear command sent to display.",
        }))),
        Err(e) => {
            tracing::error!("Clear failed: {}", e);
            Err(err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "Error", "message": e.to_string() }),
            ))
        }
    }
}

/// GET /cross
pub async fn draw_cross(State(state): State<AppState>) -> ApiResult {
    match state.processor.device().cross().await {
        Ok(response) => Ok(Json(json!({
            "status": "cross called",
            "device_response": response.body,
        }))),
        Err(e) => {
            tracing::error!("Cross failed: {}", e);
            Err(err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "Error", "message": e.to_string() }),
            ))
        }
    }
}

/// POST /displayText - JSON `{"text": ...}`, mirrors the display's status
pub async fn display_text(
    State(state): State<AppState>,
    Json(body): Json<TextRequest>,
) -> (StatusCode, Json<Value>) {
    let text = match body.text {
        Some(text) if !text.is_empty() => text,
        _ => {
            return err_json(StatusCode::BAD_REQUEST, json!({ "error": "No text provided" }));
        }
    };

    match state.processor.device().display_text(&text).await {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(json!({
                    "status": "Sent to display",
                    "device_response": response.body,
                })),
            )
        }
        Err(e) => {
            tracing::error!("Text display failed: {}", e);
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to connect to display", "message": e.to_string() }),
            )
        }
    }
}

/// Health check endpoint
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
