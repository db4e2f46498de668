use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::ExporterState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub devices: usize,
    pub reporting: usize,
}

pub async fn metrics(State(state): State<ExporterState>) -> Response {
    let body = state.exporter.render().await;
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
}

pub async fn health(State(state): State<ExporterState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        devices: state.devices,
        reporting: state.exporter.device_count().await,
    })
}
