//! Integration tests for the REST transport and error classification

use super::*;
use aspera_rest::{
    graphql_errors_handler, AuthConfig, CallDescriptor, HttpMethod, RestError,
    SimpleFieldHandler, TransportConfig,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_create_and_read() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/packages"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({"name": "report"})))
        .respond_with(success_response(json!({"id": "42"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/packages"))
        .and(query_param("page", "2"))
        .respond_with(success_response(json!([{"id": "42"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = client(&mock_server, AuthConfig::None);

    let created = api.create("packages", json!({"name": "report"})).await.unwrap();
    assert_eq!(created.status(), 200);
    assert_eq!(created.json().unwrap()["id"], "42");

    let listed = api.read("packages", &[("page", "2")]).await.unwrap();
    assert_eq!(listed.json().unwrap()[0]["id"], "42");
}

#[tokio::test]
async fn test_basic_and_url_auth() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/info"))
        .and(header("authorization", "Basic YWxpY2U6cHc="))
        .respond_with(success_response(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/public"))
        .and(query_param("token", "T"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
        .expect(1)
        .mount(&mock_server)
        .await;

    client(&mock_server, AuthConfig::basic("alice", "pw"))
        .read("info", &[])
        .await
        .unwrap();

    let public = client(&mock_server, AuthConfig::url([("token", "T")]))
        .read("public", &[])
        .await
        .unwrap();
    assert_eq!(public.data.as_text(), Some("plain"));
}

#[tokio::test]
async fn test_forbidden_classified_by_pipeline() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/quota"))
        .respond_with(error_response(
            403,
            json!({"error": {"message": "quota exceeded", "code": "Q1"}}),
        ))
        .mount(&mock_server)
        .await;

    let mut config = TransportConfig::default();
    config
        .pipeline
        .register(SimpleFieldHandler::new("error", "message", false));
    let api = client_with_config(&mock_server, AuthConfig::None, config);

    let error = api.read("quota", &[]).await.unwrap_err();

    match error {
        RestError::Call(error) => {
            assert_eq!(error.status(), 403);
            assert_eq!(
                error.messages,
                vec![
                    "quota exceeded".to_string(),
                    "code: Q1".to_string(),
                    "127.0.0.1 403 Forbidden".to_string(),
                ]
            );
        }
        other => panic!("expected call error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_embedded_error_on_ok_status() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .respond_with(success_response(
            json!({"data": null, "errors": [{"message": "field missing"}]}),
        ))
        .mount(&mock_server)
        .await;

    let mut config = TransportConfig::default();
    config.pipeline.register(graphql_errors_handler());
    let api = client_with_config(&mock_server, AuthConfig::None, config);

    let error = api
        .create("graphql", json!({"query": "{ me }"}))
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(200));
    assert_eq!(error.to_string(), "field missing");

    let returned = api
        .call(
            CallDescriptor::new(HttpMethod::Post, "graphql")
                .json_body(json!({"query": "{ me }"}))
                .return_errors(true),
        )
        .await
        .unwrap();
    assert_eq!(returned.messages, vec!["field missing".to_string()]);
}

#[tokio::test]
async fn test_same_origin_redirect_within_budget() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/api/new"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/new"))
        .respond_with(success_response(json!({"moved": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = client(&mock_server, AuthConfig::None);

    let followed = api
        .call(CallDescriptor::new(HttpMethod::Get, "old").max_redirects(1))
        .await
        .unwrap();
    assert_eq!(followed.json().unwrap()["moved"], true);

    let not_followed = api
        .call(CallDescriptor::new(HttpMethod::Get, "old"))
        .await
        .unwrap_err();
    assert_eq!(not_followed.status(), Some(302));
}

#[tokio::test]
async fn test_redirect_loop_exhausts_budget() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/loop"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/api/loop"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let error = client(&mock_server, AuthConfig::None)
        .call(CallDescriptor::new(HttpMethod::Get, "loop").max_redirects(2))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        RestError::Protocol(aspera_rest::ProtocolError::TooManyRedirects { max: 2 })
    ));
}

#[tokio::test]
async fn test_cross_origin_redirect_drops_credentials() {
    let origin = setup_mock_server().await;
    let other = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/files/1"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/blob/1?sig=abc", other.uri()).as_str()),
        )
        .expect(1)
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/blob/1"))
        .and(query_param("sig", "abc"))
        .respond_with(success_response(json!({"size": 3})))
        .expect(1)
        .mount(&other)
        .await;

    let result = client(&origin, AuthConfig::basic("alice", "pw"))
        .call(CallDescriptor::new(HttpMethod::Get, "files/1").max_redirects(1))
        .await
        .unwrap();
    assert_eq!(result.json().unwrap()["size"], 3);

    let received = other.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_download_uses_content_disposition() {
    let mock_server = setup_mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/files/7/content"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"report.txt\"")
                .set_body_bytes(b"hello world".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, AuthConfig::None)
        .download("files/7/content", dir.path().join("download.bin"))
        .await
        .unwrap();

    let written = dir.path().join("report.txt");
    assert_eq!(result.file.as_deref(), Some(written.as_path()));
    assert_eq!(std::fs::read(&written).unwrap(), b"hello world");
    assert!(!dir.path().join("download.bin").exists());
    assert!(!dir.path().join("report.txt.download").exists());
}

#[tokio::test]
async fn test_download_error_leaves_no_file() {
    let mock_server = setup_mock_server().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/files/8/content"))
        .respond_with(error_response(404, json!({"error": {"message": "no such file"}})))
        .mount(&mock_server)
        .await;

    let target = dir.path().join("missing.bin");
    let error = client(&mock_server, AuthConfig::None)
        .download("files/8/content", &target)
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(404));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_custom_verb() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("CANCEL"))
        .and(path("/api/transfers/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, AuthConfig::None)
        .cancel("transfers/9")
        .await
        .unwrap();
    assert_eq!(result.status(), 204);
}
