//! HTTP handler for the transformer round trip.

use std::time::Instant;

use axum::{Json, body::Bytes, extract::State};

use crate::{
    AppState,
    api::models::run::{RunRequest, RunResponse},
    errors::Result,
    metrics,
};

/// Run the configured transformer over `inputText` and return its output as `outputText`.
///
/// The body is parsed leniently (see [`RunRequest::from_body`]). Every transformer failure maps
/// to HTTP 500 with `{"error": "C++ program error"}`.
#[tracing::instrument(skip_all, fields(transformer = state.transformer.name()))]
pub async fn run_cpp(State(state): State<AppState>, body: Bytes) -> Result<Json<RunResponse>> {
    let request = RunRequest::from_body(&body);

    let _permit = match &state.limiter {
        Some(limiter) => Some(limiter.acquire().await?),
        None => None,
    };

    let started = Instant::now();
    let result = state.transformer.transform(&request.input_text).await;
    metrics::record_transform(state.transformer.name(), metrics::outcome_label(&result), started.elapsed());

    Ok(Json(RunResponse { output_text: result? }))
}
