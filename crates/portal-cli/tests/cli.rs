//! Integration tests for the portal binary against a mock API.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_json() -> serde_json::Value {
    json!({
        "id": "8f1c",
        "firstName": "Ana",
        "lastName": "Souza",
        "email": "ana@example.com"
    })
}

fn auth_json(access: &str, refresh: &str) -> serde_json::Value {
    let mut payload = user_json();
    payload["tokens"] = json!({ "accessToken": access, "refreshToken": refresh });
    payload
}

fn portal(home: &Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("portal");
    cmd.env("PORTAL_HOME", home)
        .env("PORTAL_API_URL", server.uri())
        .env("PORTAL_TOKEN_BACKEND", "file")
        .env_remove("PORTAL_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn write_tokens(home: &Path, access: &str, refresh: &str) {
    let contents = json!({ "accessToken": access, "refreshToken": refresh });
    fs::write(home.join("tokens.json"), contents.to_string()).unwrap();
}

fn read_tokens(home: &Path) -> Option<serde_json::Value> {
    let raw = fs::read_to_string(home.join("tokens.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

#[tokio::test]
async fn test_status_without_session() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    portal(home.path(), &server)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"))
        .stdout(predicate::str::contains("file ("));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_persists_tokens() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_json("acc-1", "ref-1")))
        .expect(1)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args(["login", "--email", "ana@example.com"])
        .env("PORTAL_PASSWORD", "secret1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Login successful"))
        .stdout(predicate::str::contains("Hello, Ana"));

    let tokens = read_tokens(home.path()).expect("tokens file should exist");
    assert_eq!(tokens["accessToken"], "acc-1");
    assert_eq!(tokens["refreshToken"], "ref-1");

    let config = fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("ana@example.com"));
}

#[tokio::test]
async fn test_login_validation_blocks_request() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args(["login", "--email", "not-an-email"])
        .env("PORTAL_PASSWORD", "123")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Email is invalid"))
        .stderr(predicate::str::contains("at least 6 characters"));
}

#[tokio::test]
async fn test_login_failure_shows_server_message() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args(["login", "--email", "ana@example.com"])
        .env("PORTAL_PASSWORD", "wrong-password")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    assert!(read_tokens(home.path()).is_none());
}

#[tokio::test]
async fn test_login_failure_shows_message_for_other_statuses() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "User not found" })),
        )
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args(["login", "--email", "nobody@example.com"])
        .env("PORTAL_PASSWORD", "secret1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: User not found"))
        .stderr(predicate::str::contains("Resource not found").not());
}

#[tokio::test]
async fn test_api_url_flag_overrides_environment() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_tokens(home.path(), "acc", "ref");

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    // Nothing listens on the discard port
    portal(home.path(), &server)
        .env("PORTAL_API_URL", "http://127.0.0.1:9/api")
        .args(["--api-url", &server.uri(), "home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Ana"));

    assert!(read_tokens(home.path()).is_some());
}

#[tokio::test]
async fn test_home_restores_session() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_tokens(home.path(), "acc", "ref");

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Ana"));
}

#[tokio::test]
async fn test_home_refreshes_expired_token() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_tokens(home.path(), "expired", "ref");

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "fresh",
            "refreshToken": "ref-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .arg("home")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello, Ana"));

    let tokens = read_tokens(home.path()).unwrap();
    assert_eq!(tokens["accessToken"], "fresh");
    assert_eq!(tokens["refreshToken"], "ref-2");
}

#[tokio::test]
async fn test_home_with_dead_session_signs_out() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_tokens(home.path(), "expired", "revoked");

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/refresh-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .arg("home")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));

    assert!(!home.path().join("tokens.json").exists());
}

#[tokio::test]
async fn test_signout_removes_tokens() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_tokens(home.path(), "acc", "ref");

    portal(home.path(), &server)
        .arg("signout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    assert!(!home.path().join("tokens.json").exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signup_with_flags() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_json("acc-s", "ref-s")))
        .expect(1)
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args([
            "signup",
            "--first-name",
            "Ana",
            "--last-name",
            "Souza",
            "--email",
            "ana@example.com",
            "--accept-terms",
        ])
        .env("PORTAL_PASSWORD", "secret1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Account created!"))
        .stdout(predicate::str::contains("Hello, Ana"));

    let tokens = read_tokens(home.path()).unwrap();
    assert_eq!(tokens["accessToken"], "acc-s");
}

#[tokio::test]
async fn test_signup_failure_is_generic() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Email in use" })))
        .mount(&server)
        .await;

    portal(home.path(), &server)
        .args([
            "signup",
            "--first-name",
            "Ana",
            "--last-name",
            "Souza",
            "--email",
            "ana@example.com",
            "--accept-terms",
        ])
        .env("PORTAL_PASSWORD", "secret1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to create account"));
}
