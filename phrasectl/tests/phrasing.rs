//! End-to-end tests: the server running the real `phrasing` binary as its external transformer.

use std::path::{Path, PathBuf};
use std::process::Command;

use axum::http::StatusCode;
use axum_test::TestServer;
use phrasectl::{
    Application, Config,
    config::TransformerKind,
    lexer::{self, CONSTANT_TABLE_HEADING, IDENTIFIER_TABLE_HEADING},
};
use serde_json::json;

const PHRASING: &str = env!("CARGO_BIN_EXE_phrasing");

async fn create_server(staging_dir: &Path) -> TestServer {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.transformer.kind = TransformerKind::External;
    config.transformer.program = PathBuf::from(PHRASING);
    config.staging.dir = Some(staging_dir.to_path_buf());

    let app = Application::new(config).await.expect("Failed to create application");
    TestServer::new(app.into_router()).expect("Failed to create test server")
}

fn staged_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test_log::test(tokio::test)]
async fn run_cpp_returns_phrasing_report() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(dir.path()).await;

    let source = "int count = 10;\nif count >= 2 then count = count % 2;\n";
    let response = server.post("/run_cpp").json(&json!({ "inputText": source })).await;

    response.assert_status_ok();
    response.assert_json(&json!({ "outputText": lexer::report(source) }));
    assert_eq!(staged_file_count(dir.path()), 0);
}

#[tokio::test]
async fn run_cpp_reports_lexical_errors_as_output() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(dir.path()).await;

    let response = server.post("/run_cpp").json(&json!({ "inputText": "if1 123a <= x" })).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let output = body["outputText"].as_str().unwrap();
    assert!(output.starts_with("if1\t(if1 , err)\n123a\t(123a , err)\n<=\t(<= , err)\nx\t(x , 41)\n"));
    assert!(output.contains(IDENTIFIER_TABLE_HEADING));
    assert!(output.contains(CONSTANT_TABLE_HEADING));
}

#[tokio::test]
async fn run_cpp_with_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let server = create_server(dir.path()).await;

    let response = server.post("/run_cpp").json(&json!({ "inputText": "" })).await;

    response.assert_status_ok();
    response.assert_json(&json!({ "outputText": lexer::report("") }));
}

#[tokio::test]
async fn run_cpp_fails_when_binary_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.transformer.program = dir.path().join("phrasing");
    config.staging.dir = Some(dir.path().to_path_buf());
    let server = TestServer::new(Application::new(config).await.unwrap().into_router()).unwrap();

    let response = server.post("/run_cpp").json(&json!({ "inputText": "int x;" })).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({ "error": "C++ program error" }));
    assert_eq!(staged_file_count(dir.path()), 0);
}

#[test]
fn phrasing_requires_two_arguments() {
    let output = Command::new(PHRASING).arg("only-one").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "Usage: phrasing <input_file> <output_file>");
}

#[test]
fn phrasing_rejects_unreadable_input() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(PHRASING)
        .arg(dir.path().join("missing.txt"))
        .arg(dir.path().join("out.txt"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn phrasing_appends_report_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    std::fs::write(&input, "char c;").unwrap();
    std::fs::write(&out, "previous\n").unwrap();

    let output = Command::new(PHRASING).arg(&input).arg(&out).output().unwrap();

    assert!(output.status.success());
    assert!(output.stderr.is_empty());
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        format!("previous\n{}", lexer::report("char c;"))
    );
}
