//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response bodies
//!
//! # API Structure
//!
//! - `POST /run_cpp`: run the configured transformer over `inputText`
//! - `GET /`: the landing page (embedded static assets)
//! - `GET /healthz`: liveness
//! - `GET /internal/metrics`: Prometheus metrics, when enabled

pub mod handlers;
pub mod models;
