//! End-to-end sync runs against a mock Pipedrive server
//!
//! Each test loads a real `crmsync.yaml` from a temporary directory, builds
//! the HTTP client from it, and checks which requests reach the server.

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crmsync_core::{Config, PipedriveClient, SyncStage, Synchronizer, UpsertAction};

/// Helper to write a project directory pointing at `server`.
///
/// Returns a `TempDir` that automatically cleans up when dropped.
fn setup_project(server: &MockServer, mapping: &str, input: Value) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(
        dir.path().join("crmsync.yaml"),
        format!(
            r#"
pipedrive:
  api_token: "{{{{ env_var('CRMSYNC_IT_UNSET_TOKEN', 'it-token') }}}}"
  base_url: "{}/api/v1"
mapping:
{}
input: data/person.json
"#,
            server.uri(),
            mapping
        ),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("data/person.json"),
        serde_json::to_string_pretty(&input).unwrap(),
    )
    .unwrap();
    dir
}

const JANE_MAPPING: &str = r#"  - pipedriveKey: name
    inputKey: fullName
  - pipedriveKey: email
    inputKey: contact.email"#;

fn jane_input() -> Value {
    json!({"fullName": "Jane Doe", "contact": {"email": "jane@x.com"}})
}

fn jane_body() -> Value {
    json!({
        "name": "Jane Doe",
        "email": [{"value": "jane@x.com", "primary": true, "label": "work"}]
    })
}

async fn run(dir: &TempDir) -> crmsync_core::Result<crmsync_core::SyncOutcome> {
    let config = Config::load(dir.path())?;
    config.sync.validate()?;
    let client = PipedriveClient::new(&config.sync.pipedrive)?;
    let input = config.load_input()?;
    Synchronizer::new(&config.sync.mapping, &client)
        .sync(&input)
        .await
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_new_person_is_created() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/persons/search"))
        .and(query_param("term", "Jane Doe"))
        .and(query_param("api_token", "it-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"items": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/persons"))
        .and(body_json(jane_body()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": 101, "name": "Jane Doe", "email": [{"value": "jane@x.com", "primary": true, "label": "work"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = setup_project(&server, JANE_MAPPING, jane_input());
    let outcome = run(&dir).await.unwrap();

    assert_eq!(outcome.action, UpsertAction::Created);
    assert_eq!(outcome.person.id.get(), 101);
}

#[tokio::test]
async fn test_existing_person_is_updated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/persons/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"items": [{"result_score": 1.0, "item": {"id": 42, "name": "Jane Doe"}}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/persons/42"))
        .and(body_json(jane_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 42, "name": "Jane Doe"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = setup_project(&server, JANE_MAPPING, jane_input());
    let outcome = run(&dir).await.unwrap();

    assert_eq!(outcome.action, UpsertAction::Updated);
    assert_eq!(outcome.person.id.get(), 42);
}

#[tokio::test]
async fn test_null_fields_are_not_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/persons/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"items": []}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/persons"))
        .and(body_json(json!({"name": "Jane Doe"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": 5, "name": "Jane Doe"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mapping = r#"  - pipedrive_key: name
    input_key: fullName
  - pipedrive_key: email
    input_key: contact.email
  - pipedrive_key: phone
    input_key: contact.phones[0]"#;
    let input = json!({"fullName": "Jane Doe", "contact": {"email": null, "phones": []}});

    let dir = setup_project(&server, mapping, input);
    run(&dir).await.unwrap();
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_missing_name_mapping_sends_nothing() {
    let server = MockServer::start().await;
    let mapping = r#"  - pipedrive_key: email
    input_key: contact.email"#;

    let dir = setup_project(&server, mapping, jane_input());
    let config = Config::load(dir.path()).unwrap();
    let client = PipedriveClient::new(&config.sync.pipedrive).unwrap();
    let input = config.load_input().unwrap();

    let err = Synchronizer::new(&config.sync.mapping, &client)
        .sync(&input)
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(err.stage(), Some(SyncStage::ValidateMapping));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_missing_identity_value_sends_nothing() {
    let server = MockServer::start().await;

    let dir = setup_project(&server, JANE_MAPPING, json!({"contact": {"email": "jane@x.com"}}));
    let err = run(&dir).await.unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(
        err.to_string(),
        "identity resolution failed: invalid configuration: missing or non-string identifying value at 'fullName'"
    );
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_lookup_failure_skips_upsert() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/persons/search"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Internal error"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = setup_project(&server, JANE_MAPPING, jane_input());
    let err = run(&dir).await.unwrap_err();

    assert_eq!(err.stage(), Some(SyncStage::Lookup));
    assert_eq!(
        err.to_string(),
        "person lookup failed: search request failed: HTTP 500 Internal Server Error: Internal error"
    );
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}
