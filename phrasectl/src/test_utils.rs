//! Helpers shared by the in-crate tests.

use std::{path::Path, path::PathBuf, time::Duration};

use axum_test::TestServer;

use crate::config::{Config, TransformerKind};
use crate::{AppState, build_router};

/// Configuration for tests: loopback on an ephemeral port, metrics and export off.
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        enable_metrics: false,
        enable_otel_export: false,
        ..Default::default()
    }
}

/// Build the full router for `config` and wrap it in a test server.
pub fn create_test_app(config: Config) -> TestServer {
    let state = AppState::from_config(config);
    let router = build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// A configuration whose external transformer runs `script` through `sh -c`.
///
/// The staged input and output paths arrive as `$0` and `$1`. Staged files go to `staging_dir`.
pub fn shell_transformer(script: &str, staging_dir: &Path) -> Config {
    let mut config = create_test_config();
    config.transformer.kind = TransformerKind::External;
    config.transformer.program = PathBuf::from("sh");
    config.transformer.args = vec!["-c".to_string(), script.to_string()];
    config.transformer.timeout = Duration::from_secs(10);
    config.staging.dir = Some(staging_dir.to_path_buf());
    config
}
