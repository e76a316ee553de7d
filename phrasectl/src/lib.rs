//! # phrasectl: web front-end for a lexical analysis program
//!
//! `phrasectl` serves a single page where users paste source text, and one JSON endpoint that runs
//! that text through a transformer and returns the report it produced.
//!
//! ## Request Flow
//!
//! A `POST /run_cpp` body of the form `{"inputText": "..."}` is handed to the configured
//! [`Transformer`](transformer::Transformer):
//!
//! - The **external** transformer writes the text to a fresh staged file, runs
//!   `<program> <input_path> <output_path>`, and reads the output file back. Staged files are
//!   removed once the request finishes, whatever the outcome.
//! - The **builtin** transformer runs the [`lexer`] in-process and produces the same report.
//!
//! The report comes back as `{"outputText": "..."}`. Any failure along the way (the program could
//! not start, wrote to stderr, timed out, or left no readable output) is logged with its cause and
//! answered with HTTP 500 and `{"error": "C++ program error"}`. The program's exit status does not
//! decide the outcome; a non-zero exit is only logged.
//!
//! Optionally, a [`TransformLimiter`](limits::TransformLimiter) bounds how many invocations run at
//! once; requests that cannot get a slot in time receive HTTP 429.
//!
//! ## Modules
//!
//! - [`api`]: route handlers and request/response bodies
//! - [`config`]: YAML + environment configuration
//! - [`errors`]: the error type every handler returns
//! - [`transformer`]: the external and builtin transformers
//! - [`staging`]: staged input/output file pairs
//! - [`lexer`]: the tokenizer and report writer shared with the `phrasing` binary
//! - [`limits`]: concurrency limiting for transformer invocations
//! - [`metrics`]: transform counters and histograms
//! - [`telemetry`]: tracing and optional OpenTelemetry export

pub mod api;
pub mod config;
pub mod errors;
pub mod lexer;
pub mod limits;
pub mod metrics;
pub mod staging;
mod static_assets;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod transformer;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue, Method},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};

pub use config::Config;

use crate::config::{CorsOrigin, TransformerKind};
use crate::limits::TransformLimiter;
use crate::transformer::Transformer;

/// Shared state handed to every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub transformer: Arc<dyn Transformer>,
    pub limiter: Option<Arc<TransformLimiter>>,
}

impl AppState {
    /// State for the given configuration: the configured transformer and, if enabled, a limiter.
    pub fn from_config(config: Config) -> Self {
        let transformer = transformer::from_config(&config);
        let limiter = TransformLimiter::new(&config.limits.transforms).map(Arc::new);

        AppState::builder()
            .transformer(transformer)
            .maybe_limiter(limiter)
            .config(config)
            .build()
    }
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// Routes:
/// - `POST /run_cpp`, body limited to `limits.max_body_size`
/// - `GET /healthz`
/// - `GET /internal/metrics` when `enable_metrics` is set
/// - everything else falls back to the embedded landing page
///
/// CORS and request tracing wrap every route.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/run_cpp",
            post(api::handlers::run::run_cpp).layer(DefaultBodyLimit::max(state.config.limits.max_body_size)),
        )
        .with_state(state.clone())
        .fallback(api::handlers::static_assets::serve_embedded_asset);

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        ),
    );

    Ok(router)
}

/// The HTTP server and everything it needs.
///
/// 1. **Create**: [`Application::new`] builds the transformer, limiter and router
/// 2. **Serve**: [`Application::serve`] binds the configured address and handles requests until
///    the shutdown future resolves, letting in-flight requests finish
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting phrasectl with configuration: {:#?}", config);

        if config.transformer.kind == TransformerKind::External {
            // Not fatal: the program may be installed after startup, requests fail with 500 until then
            if let Err(e) = tokio::fs::metadata(&config.transformer.program).await {
                warn!(
                    program = %config.transformer.program.display(),
                    error = %e,
                    "Transformer program not found, /run_cpp requests will fail until it exists"
                );
            }
        }

        let state = AppState::from_config(config.clone());
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// The router without a listener, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "phrasectl listening on http://{}, available at http://localhost:{}",
            bind_addr,
            listener.local_addr().map(|a| a.port()).unwrap_or(self.config.port)
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_healthz() {
        let server = create_test_app(create_test_config());

        let response = server.get("/healthz").await;

        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[tokio::test]
    async fn test_landing_page_is_served() {
        let server = create_test_app(create_test_config());

        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains("/run_cpp"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_absent_by_default() {
        let server = create_test_app(create_test_config());

        let response = server.get("/internal/metrics").await;

        // Falls through to the landing page
        response.assert_status_ok();
        assert!(response.text().contains("<!doctype html>"));
    }

    #[test_log::test(tokio::test)]
    async fn test_metrics_endpoint_when_enabled() {
        let mut config = create_test_config();
        config.enable_metrics = true;
        config.transformer.kind = TransformerKind::Builtin;
        let server = create_test_app(config);

        server.post("/run_cpp").json(&serde_json::json!({ "inputText": "int x;" })).await.assert_status_ok();

        let response = server.get("/internal/metrics").await;
        response.assert_status_ok();
        assert!(response.text().contains("axum_http_requests_total"));
    }

    #[tokio::test]
    async fn test_cors_preflight_for_listed_origin() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Url("https://app.example.com".parse().unwrap())];
        let server = create_test_app(config);

        let response = server
            .method(Method::OPTIONS, "/run_cpp")
            .add_header(http::header::ORIGIN, HeaderValue::from_static("https://app.example.com"))
            .add_header(http::header::ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            response.headers().get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|v| v.to_str().unwrap()),
            Some("https://app.example.com")
        );
    }

    #[tokio::test]
    async fn test_application_reports_missing_program_but_starts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.transformer.program = dir.path().join("absent");

        let server = Application::new(config).await.unwrap().into_test_server();

        server.get("/healthz").await.assert_status_ok();
        server
            .post("/run_cpp")
            .json(&serde_json::json!({ "inputText": "x" }))
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let mut config = create_test_config();
        config.transformer.kind = TransformerKind::Builtin;
        let app = Application::new(config).await.unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(app.serve(async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        tokio_test::assert_ok!(result.unwrap().unwrap());
    }
}
