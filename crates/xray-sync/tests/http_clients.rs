//! HTTP client tests against a mock Jira and Xray server.

use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{
    basic_auth, bearer_token, body_json, body_partial_json, body_string_contains, header_regex,
    method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xray_sync::client::{
    Credentials, JiraClient, JiraHttpClient, XrayClient, XrayCloudCredentials, XrayHttpClient,
    XrayMode,
};
use xray_sync::domain::{IssueEdit, IssueKey};
use xray_sync::Error;

fn feature_file(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("login.feature");
    std::fs::write(
        &file,
        "Feature: Login\n  @CYP-1\n  Scenario: Logs in\n    Given a user\n",
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_search_reads_every_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .and(bearer_token("pat"))
        .and(body_partial_json(json!({"startAt": 0, "fields": ["summary"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "maxResults": 2,
            "total": 3,
            "issues": [
                {"key": "CYP-1", "fields": {"summary": "one"}},
                {"key": "CYP-2", "fields": {"summary": "two"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .and(body_partial_json(json!({"startAt": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 2,
            "maxResults": 2,
            "total": 3,
            "issues": [{"key": "CYP-3", "fields": {"summary": "three"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::pat("pat")).unwrap();
    let issues = jira
        .search_issues("issue in (CYP-1,CYP-2,CYP-3)", &["summary".to_string()])
        .await
        .unwrap()
        .unwrap();

    let keys: Vec<_> = issues.iter().filter_map(|i| i.key.clone()).collect();
    assert_eq!(
        keys,
        vec![IssueKey::new("CYP-1"), IssueKey::new("CYP-2"), IssueKey::new("CYP-3")]
    );
    assert_eq!(issues[2].fields["summary"], "three");
}

#[tokio::test]
async fn test_cloud_search_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search/jql"))
        .and(body_json(json!({
            "jql": "issue in (CYP-1,CYP-2)",
            "fields": ["summary"],
            "maxResults": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{"key": "CYP-1", "fields": {"summary": "one"}}],
            "nextPageToken": "page-2",
            "isLast": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search/jql"))
        .and(body_partial_json(json!({"nextPageToken": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{"key": "CYP-2", "fields": {"summary": "two"}}],
            "isLast": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(410))
        .expect(0)
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::basic("user@example.com", "token"))
        .unwrap()
        .with_cloud(true);
    let issues = jira
        .search_issues("issue in (CYP-1,CYP-2)", &["summary".to_string()])
        .await
        .unwrap()
        .unwrap();

    let keys: Vec<_> = issues.iter().filter_map(|i| i.key.clone()).collect();
    assert_eq!(keys, vec![IssueKey::new("CYP-1"), IssueKey::new("CYP-2")]);
}

#[tokio::test]
async fn test_search_without_issues_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"warningMessages": []})))
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::pat("pat")).unwrap();
    let issues = jira.search_issues("issue in (CYP-1)", &[]).await.unwrap();

    assert!(issues.is_none());
}

#[tokio::test]
async fn test_list_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/field"))
        .and(basic_auth("user", "token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "summary", "name": "Summary", "custom": false, "clauseNames": ["summary"],
             "schema": {"type": "string", "system": "summary"}},
            {"id": "customfield_10100", "name": "Test Type", "custom": true}
        ])))
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::basic("user", "token")).unwrap();
    let fields = jira.list_fields().await.unwrap().unwrap();

    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1].id, "customfield_10100");
    assert!(fields[1].schema.is_none());
}

#[tokio::test]
async fn test_edit_issue_sends_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/2/issue/CYP-1"))
        .and(body_json(json!({"fields": {"labels": ["a", "b"]}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::pat("pat")).unwrap();
    jira.edit_issue(&IssueKey::new("CYP-1"), &IssueEdit::single("labels", json!(["a", "b"])))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/rest/api/2/issue/CYP-1"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"errors":{"summary":"Field cannot be set"}}"#),
        )
        .mount(&server)
        .await;

    let jira = JiraHttpClient::new(&server.uri(), Credentials::pat("pat")).unwrap();
    let error = jira
        .edit_issue(&IssueKey::new("CYP-1"), &IssueEdit::single("summary", "x"))
        .await
        .unwrap_err();

    match error {
        Error::Api { status, body, url } => {
            assert_eq!(status, 400);
            assert!(body.contains("Field cannot be set"));
            assert!(url.ends_with("/rest/api/2/issue/CYP-1"));
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_import_uses_jira_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/raven/1.0/import/feature"))
        .and(query_param("projectKey", "CYP"))
        .and(basic_auth("user", "password"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("Scenario: Logs in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "10001", "key": "CYP-1", "self": "http://jira/rest/api/2/issue/10001"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let xray = XrayHttpClient::new(XrayMode::Server {
        jira_url: server.uri(),
        credentials: Credentials::basic("user", "password"),
    })
    .unwrap();

    let response = xray.import_feature(&feature_file(&dir), "CYP").await.unwrap();

    assert_eq!(response.updated_or_created_issues, vec![IssueKey::new("CYP-1")]);
    assert!(response.errors.is_empty());
}

#[tokio::test]
async fn test_cloud_import_authenticates_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/authenticate"))
        .and(body_json(json!({"client_id": "id", "client_secret": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("cloud-token")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/import/feature"))
        .and(query_param("projectKey", "CYP"))
        .and(bearer_token("cloud-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": ["Scenario Outline without examples"],
            "updatedOrCreatedTests": [{"id": "1", "key": "CYP-1", "self": "x"}],
            "updatedOrCreatedPreconditions": []
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = feature_file(&dir);
    let xray = XrayHttpClient::new(XrayMode::Cloud {
        url: server.uri(),
        credentials: XrayCloudCredentials::new("id", "secret"),
    })
    .unwrap();

    let first = xray.import_feature(&file, "CYP").await.unwrap();
    let second = xray.import_feature(&file, "CYP").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.updated_or_created_issues, vec![IssueKey::new("CYP-1")]);
    assert_eq!(first.errors, vec!["Scenario Outline without examples"]);
}

#[tokio::test]
async fn test_cloud_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/authenticate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid client"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let xray = XrayHttpClient::new(XrayMode::Cloud {
        url: server.uri(),
        credentials: XrayCloudCredentials::new("id", "wrong"),
    })
    .unwrap();

    let error = xray.import_feature(&feature_file(&dir), "CYP").await.unwrap_err();
    assert!(matches!(error, Error::Authentication(message) if message.contains("invalid client")));
}

#[tokio::test]
async fn test_import_of_missing_file_is_io_error() {
    let xray = XrayHttpClient::new(XrayMode::Server {
        jira_url: "http://127.0.0.1:9".to_string(),
        credentials: Credentials::pat("pat"),
    })
    .unwrap();

    let error = xray
        .import_feature(std::path::Path::new("/does/not/exist.feature"), "CYP")
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Io(_)));
}
