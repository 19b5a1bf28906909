//! Integration tests for `NodeClient` against a wiremock server.

use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fedscan_client::{ChecksumAlgorithm, ClientConfig, ClientError, NodeClient, NodeKind};

async fn client_for(server: &MockServer) -> NodeClient {
    NodeClient::new(server.uri(), &ClientConfig::new()).unwrap()
}

fn record_json(pid: &str, modified: &str, digest: &str) -> serde_json::Value {
    json!({
        "identifier": pid,
        "modifiedAt": modified,
        "checksum": {"algorithm": "SHA-256", "digest": digest},
    })
}

#[tokio::test]
async fn list_objects_sends_paging_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/object"))
        .and(query_param("start", "100"))
        .and(query_param("count", "50"))
        .and(query_param("nodeId", "urn:node:MN1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 120,
            "start": 100,
            "records": [record_json("pid-x", "2024-05-01T00:00:00Z", "aa")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let page = client
        .list_objects(100, 50, Some("urn:node:MN1"))
        .await
        .unwrap();

    assert_eq!(page.total, 120);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].identifier, "pid-x");
}

#[tokio::test]
async fn count_objects_uses_zero_count_probe() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/object"))
        .and(query_param("count", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 98765,
            "start": 0,
            "records": [],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.count_objects(None).await.unwrap(), 98765);
}

#[tokio::test]
async fn system_metadata_not_found_is_typed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/meta/pid-missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_system_metadata("pid-missing").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn system_metadata_parses_replica_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/meta/pid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "identifier": "pid-1",
            "checksum": {"algorithm": "MD5", "digest": "ABCDEF"},
            "size": 1024,
            "replicas": [
                {"nodeId": "urn:node:MN1", "status": "completed"},
                {"nodeId": "urn:node:MN2", "status": "failed"},
            ],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let meta = client.get_system_metadata("pid-1").await.unwrap();
    assert_eq!(meta.checksum.algorithm, ChecksumAlgorithm::Md5);
    assert_eq!(meta.checksum.digest, "abcdef"); // normalized
    assert_eq!(meta.replicas.len(), 2);
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/object"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_objects(0, 10, None).await.unwrap_err();
    match err {
        ClientError::UnexpectedStatus { status, detail, .. } => {
            assert_eq!(status, 502);
            assert!(detail.contains("bad gateway"));
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/object"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"total\": "))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_objects(0, 10, None).await.unwrap_err();
    assert!(matches!(err, ClientError::Parse { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn stream_object_yields_bytes_incrementally() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/object/pid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut stream = client.stream_object("pid-1").await.unwrap();
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, b"hello world");
}

#[tokio::test]
async fn list_nodes_and_index_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/node"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"nodeId": "urn:node:CN", "baseUrl": "https://cn.example.org", "kind": "coordinator"},
            {"nodeId": "urn:node:MN1", "baseUrl": "https://mn1.example.org", "kind": "member"},
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/index/count"))
        .and(query_param("nodeId", "urn:node:MN1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 41})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let nodes = client.list_nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].kind, NodeKind::Coordinator);

    assert_eq!(client.index_count("urn:node:MN1").await.unwrap(), 41);
}
