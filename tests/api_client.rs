// Integration tests for the API client and the two workflows, driven
// against a wiremock server. The client under test is blocking, so the
// mock server runs on its own tokio runtime while the test thread makes
// the calls.

use std::fs;
use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meshfit_cli::api::ApiClient;
use meshfit_cli::config::Config;
use meshfit_cli::subject::Subject;
use meshfit_cli::workflow::{self, FetchOutcome};

fn mock_server() -> (Runtime, MockServer) {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    (rt, server)
}

fn mount(rt: &Runtime, server: &MockServer, mock: Mock) {
    rt.block_on(mock.mount(server));
}

fn client_for(server: &MockServer) -> ApiClient {
    let config = Config {
        username: "operator".into(),
        password: "secret".into(),
        api_url: server.uri(),
        data_dir: PathBuf::from("data"),
    };
    let mut api = ApiClient::new(&config).unwrap();
    api.set_token("tok-123");
    api
}

fn write_subject(root: &std::path::Path, name: &str, metadata: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("avatar.json"), metadata).unwrap();
    dir
}

#[test]
fn authenticate_posts_password_grant_and_returns_token() {
    let (rt, server) = mock_server();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=meshcapade-me"))
            .and(body_string_contains("username=operator"))
            .and(body_string_contains("password=secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok-123",
                "expires_in": 300
            }))),
    );

    let config = Config {
        username: "operator".into(),
        password: "secret".into(),
        api_url: server.uri(),
        data_dir: PathBuf::from("data"),
    };
    let api = ApiClient::new(&config).unwrap();
    let token_url = format!("{}/token", server.uri());
    let token = api
        .authenticate_at(&token_url, &config.username, &config.password)
        .unwrap();
    assert_eq!(token, "tok-123");
}

#[test]
fn authenticate_fails_on_non_2xx() {
    let (rt, server) = mock_server();
    mount(
        &rt,
        &server,
        Mock::given(method("POST")).and(path("/token")).respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_grant"})),
        ),
    );

    let api = client_for(&server);
    let token_url = format!("{}/token", server.uri());
    let err = api
        .authenticate_at(&token_url, "operator", "wrong")
        .unwrap_err();
    assert!(err.to_string().contains("Authentication failed"));
    assert!(err.to_string().contains("401"));
}

#[test]
fn create_avatar_sends_bearer_token_and_parses_id() {
    let (rt, server) = mock_server();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/create/from-images"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "av-1", "type": "avatar" }
            }))),
    );

    let api = client_for(&server);
    assert_eq!(api.create_avatar().unwrap(), "av-1");
}

#[test]
fn create_avatar_rejects_body_without_id() {
    let (rt, server) = mock_server();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/create/from-images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}}))),
    );

    let api = client_for(&server);
    let err = api.create_avatar().unwrap_err();
    assert!(err.to_string().contains("data.id"));
}

#[test]
fn upload_workflow_uses_first_four_images_and_checkpoints_id() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    let dir = write_subject(
        temp.path(),
        "sam",
        r#"{"gender": "Female", "height": 1.75, "weight": 70.0}"#,
    );
    // Five photos on disk; only the first four in name order may be used.
    for name in ["01.jpg", "02.jpg", "03.png", "04.jpeg", "05.jpg"] {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/create/from-images"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "av-9" }
            })))
            .expect(1),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/av-9/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "links": { "upload": format!("{}/upload", server.uri()) } }
            })))
            .expect(4),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/upload"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/upload"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/av-9/fit-to-images"))
            .and(body_string_contains("\"avatarname\":\"sam\""))
            .and(body_string_contains("\"gender\":\"female\""))
            .and(body_string_contains("\"imageMode\":\"AFI\""))
            .and(body_string_contains("\"height\":1.75"))
            .and(body_string_contains("\"weight\":70.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1),
    );

    let api = client_for(&server);
    let mut subject = Subject::load(temp.path(), "sam").unwrap();
    assert_eq!(subject.images.len(), 4);

    let avatar_id = workflow::upload_avatar(&api, &mut subject).unwrap();
    assert_eq!(avatar_id, "av-9");

    // The id was checkpointed into avatar.json during the workflow.
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("avatar.json")).unwrap()).unwrap();
    assert_eq!(written["avatar_id"], "av-9");
    assert_eq!(written["gender"], "female");
}

#[test]
fn upload_workflow_with_no_images_still_fits() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    // Unknown gender falls back to neutral; no height/weight means the
    // fitting payload carries neither field.
    write_subject(temp.path(), "nia", r#"{"gender": "unknown"}"#);

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/create/from-images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": "av-2" }
            })))
            .expect(1),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/av-2/fit-to-images"))
            .and(body_json(json!({
                "avatarname": "nia",
                "gender": "neutral",
                "imageMode": "AFI"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1),
    );

    let api = client_for(&server);
    let mut subject = Subject::load(temp.path(), "nia").unwrap();
    assert!(subject.images.is_empty());

    workflow::upload_avatar(&api, &mut subject).unwrap();
}

#[test]
fn upload_workflow_aborts_on_failed_creation() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    let dir = write_subject(temp.path(), "sam", r#"{"gender": "male"}"#);

    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/avatars/create/from-images"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom")),
    );

    let api = client_for(&server);
    let mut subject = Subject::load(temp.path(), "sam").unwrap();
    let err = workflow::upload_avatar(&api, &mut subject).unwrap_err();
    assert!(err.to_string().contains("Avatar creation failed"));

    // No checkpoint was written for a creation that never happened.
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("avatar.json")).unwrap()).unwrap();
    assert!(written.get("avatar_id").is_none());
}

#[test]
fn download_reports_not_ready_and_writes_nothing() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    write_subject(
        temp.path(),
        "sam",
        r#"{"gender": "male", "avatar_id": "av-1"}"#,
    );

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/avatars/av-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": { "state": "PROCESSING" } }
            }))),
    );

    let api = client_for(&server);
    let subject = Subject::load(temp.path(), "sam").unwrap();
    match workflow::download_measurements(&api, &subject, "av-1").unwrap() {
        FetchOutcome::NotReady(state) => assert_eq!(state, "PROCESSING"),
        other => panic!("expected NotReady, got {:?}", other),
    }
    assert!(!subject.measurements_path().exists());
}

#[test]
fn download_ready_converts_and_saves_measurements() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    write_subject(
        temp.path(),
        "sam",
        r#"{"gender": "male", "avatar_id": "av-1"}"#,
    );

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/avatars/av-1"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": {
                    "state": "READY",
                    "metadata": { "bodyShape": { "mesh_measurements": {
                        "height": 170.0,
                        "weight": 70.0,
                        "build": "athletic"
                    }}}
                }}
            }))),
    );

    let api = client_for(&server);
    let subject = Subject::load(temp.path(), "sam").unwrap();
    match workflow::download_measurements(&api, &subject, "av-1").unwrap() {
        FetchOutcome::Saved(path) => assert_eq!(path, subject.measurements_path()),
        other => panic!("expected Saved, got {:?}", other),
    }

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(subject.measurements_path()).unwrap()).unwrap();
    assert_eq!(saved["height"], json!({"cm": 170.0, "in": 66.93}));
    assert_eq!(saved["weight"], json!({"kg": 70.0, "lbs": 154.32}));
    assert_eq!(saved["build"], json!("athletic"));
}

#[test]
fn download_ready_without_measurements_is_empty_outcome() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    write_subject(
        temp.path(),
        "sam",
        r#"{"gender": "male", "avatar_id": "av-1"}"#,
    );

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/avatars/av-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": { "state": "READY", "metadata": {} } }
            }))),
    );

    let api = client_for(&server);
    let subject = Subject::load(temp.path(), "sam").unwrap();
    match workflow::download_measurements(&api, &subject, "av-1").unwrap() {
        FetchOutcome::Empty => {}
        other => panic!("expected Empty, got {:?}", other),
    }
    assert!(!subject.measurements_path().exists());
}

#[test]
fn download_propagates_remote_errors() {
    let (rt, server) = mock_server();
    let temp = TempDir::new().unwrap();
    write_subject(
        temp.path(),
        "sam",
        r#"{"gender": "male", "avatar_id": "av-1"}"#,
    );

    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/avatars/av-1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden")),
    );

    let api = client_for(&server);
    let subject = Subject::load(temp.path(), "sam").unwrap();
    let err = workflow::download_measurements(&api, &subject, "av-1").unwrap_err();
    assert!(err.to_string().contains("Avatar status request failed"));
}
