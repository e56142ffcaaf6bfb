//! End-to-end CLI tests for the papercrawl binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

mod support;
use support::socket_guard::start_mock_server_or_skip;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// Runs the binary with an empty config home so a developer's own config
/// file cannot leak into the test.
fn papercrawl(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("papercrawl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .env_remove("GEMINI_API_KEY");
    cmd
}

fn write_papercrawl_config(config_home: &std::path::Path, contents: &str) {
    let config_dir = config_home.join("papercrawl");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_binary_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    papercrawl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("annotate"));
}

#[test]
fn test_binary_version() {
    let home = TempDir::new().unwrap();
    papercrawl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_rejects_zero_concurrency() {
    let home = TempDir::new().unwrap();
    papercrawl(&home)
        .args(["crawl", "-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_rejects_unknown_config_key() {
    let home = TempDir::new().unwrap();
    write_papercrawl_config(home.path(), "concurency_limit = 4\n");
    papercrawl(&home)
        .arg("crawl")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown configuration key"));
}

#[test]
fn test_binary_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    papercrawl(&home)
        .args(["--config", "/nonexistent/papercrawl.toml", "crawl"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_binary_annotate_requires_api_key() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.path().join("metadata.csv");
    std::fs::write(&input, "year,paper_url,pdf_url,title\n").unwrap();

    papercrawl(&home)
        .arg("annotate")
        .arg("--input")
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn test_binary_crawl_downloads_into_output_dir() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/paper_files/paper/2019">2019</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2019"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ul class="paper-list"><li><a href="/paper_files/paper/2019/hash/x-Abstract.html">X</a></li></ul>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2019/hash/x-Abstract.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<title>Graph Networks</title><a href="/paper_files/paper/2019/file/x-Paper.pdf">Paper</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2019/file/x-Paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-graph".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    papercrawl(&home)
        .arg("-q")
        .arg("crawl")
        .arg("--base-url")
        .arg(server.uri())
        .arg("-o")
        .arg(out.path())
        .arg("-c")
        .arg("2")
        .assert()
        .success();

    assert_eq!(
        std::fs::read(out.path().join("Graph Networks.pdf")).unwrap(),
        b"%PDF-graph"
    );
    let metadata = std::fs::read_to_string(out.path().join("metadata.csv")).unwrap();
    assert!(metadata.starts_with("year,paper_url,pdf_url,title\n"));
    assert!(metadata.contains("Graph Networks"));
}

#[tokio::test]
async fn test_binary_name_by_url() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a href="/paper_files/paper/2018">2018</a>"#),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2018"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/paper_files/paper/2018/file/direct-Paper.pdf">Direct Paper</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paper_files/paper/2018/file/direct-Paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    papercrawl(&home)
        .args(["-q", "crawl", "--name-by-url", "--base-url"])
        .arg(server.uri())
        .arg("--output-dir")
        .arg(out.path())
        .assert()
        .success();

    assert!(out.path().join("direct-Paper.pdf").exists());
}
