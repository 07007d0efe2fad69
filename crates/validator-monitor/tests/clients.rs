use serde_json::json;
use validator_monitor::clients::{
    Dashboard, DashboardClient, DashboardStats, Explorer, ExplorerClient, HttpClient, NodeClient,
    NodeRpc, QueuePosition,
};
use validator_monitor::config::{ApiConfig, ExplorerConfig};
use validator_monitor::{RetryPolicy, TransportError};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::from_client(reqwest::Client::new())
}

fn dashboard(server: &MockServer) -> DashboardClient {
    let api = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        endpoint: "/validators/{validator_address}".to_string(),
    };
    DashboardClient::new(http(), &api)
}

#[tokio::test]
async fn node_tip_and_version() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "method": "node_getL2Tips",
            "params": [],
            "id": 67
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 67,
            "result": {
                "latest": { "number": 1500, "hash": "0x01" },
                "proven": { "number": 1490, "hash": "0x02" },
                "finalized": { "number": "1480", "hash": "0x03" }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "node_getNodeInfo" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 67,
            "result": { "nodeVersion": "2.0.3", "l1ChainId": 11155111 }
        })))
        .mount(&server)
        .await;

    let node = NodeClient::new(http());
    let host = addr.ip().to_string();

    let tip = node.fetch_node_tip(&host, addr.port()).await.unwrap();
    assert_eq!(tip.latest.number, 1500);
    assert_eq!(tip.proven.number, 1490);
    assert_eq!(tip.finalized.number, 1480);

    let version = node.fetch_node_version(&host, addr.port()).await.unwrap();
    assert_eq!(version, "v2.0.3");
}

#[tokio::test]
async fn node_without_version_reports_placeholder() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 67,
            "result": {}
        })))
        .mount(&server)
        .await;

    let version = NodeClient::new(http())
        .fetch_node_version(&addr.ip().to_string(), addr.port())
        .await
        .unwrap();
    assert_eq!(version, "v0.0.0");
}

#[tokio::test]
async fn node_rpc_error_is_a_failure() {
    let server = MockServer::start().await;
    let addr = server.address();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 67,
            "error": { "code": -32601, "message": "Method not found" }
        })))
        .mount(&server)
        .await;

    let err = NodeClient::new(http())
        .fetch_node_tip(&addr.ip().to_string(), addr.port())
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TransportError::Rpc { method, .. } if method == "node_getL2Tips"),
        "{err:?}"
    );
}

#[tokio::test]
async fn unreachable_node_is_http_error() {
    // Bind and drop a server so the port is very likely closed.
    let addr = {
        let server = MockServer::start().await;
        *server.address()
    };

    let err = NodeClient::new(http())
        .fetch_node_tip(&addr.ip().to_string(), addr.port())
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn dashboard_active_validator() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/validators/0xabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "index": 42,
            "address": "0xabc",
            "status": "VALIDATING",
            "balance": "200000000000000000000000",
            "unclaimedRewards": "2500000000000000000",
            "attestationSuccess": "97.5%",
            "totalAttestationsSucceeded": 195,
            "totalAttestationsMissed": 5,
            "totalBlocksProposed": 2,
            "totalBlocksMined": 2,
            "totalBlocksMissed": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stats = dashboard(&server)
        .fetch_dashboard_stats("0xabc")
        .await
        .unwrap();

    let DashboardStats::Active(active) = &stats else {
        panic!("expected active validator, got {stats:?}");
    };
    assert_eq!(active.status_label, "VALIDATING");
    assert_eq!(active.balance, 200_000_000_000_000_000_000_000);
    assert_eq!(active.unclaimed_rewards, 2_500_000_000_000_000_000);
    assert_eq!(active.attestations_succeeded, 195);
    assert_eq!(active.attestations_missed, 5);
    assert_eq!(active.blocks_proposed, 2);
}

#[tokio::test]
async fn dashboard_not_found_as_404_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/validators/0xnew"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "Validator not found." })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/validators/queue"))
        .and(query_param("search", "0xnew"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "validatorsInQueue": [{ "address": "0xnew", "position": 314 }],
            "pagination": { "total": 1 }
        })))
        .mount(&server)
        .await;

    let client = dashboard(&server);
    assert_eq!(
        client.fetch_dashboard_stats("0xnew").await.unwrap(),
        DashboardStats::NotFound
    );
    assert_eq!(
        client.fetch_queue_position("0xnew").await.unwrap(),
        QueuePosition::Ranked(314)
    );
}

#[tokio::test]
async fn dashboard_server_error_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = dashboard(&server)
        .fetch_dashboard_stats("0xabc")
        .await
        .unwrap_err();
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert!(body.contains("maintenance"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn dashboard_rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/validators/0xabc"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "error": "Too many requests" })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/validators/0xabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "index": 7,
            "status": "VALIDATING",
            "balance": "1000",
            "totalAttestationsSucceeded": 10,
            "totalAttestationsMissed": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = dashboard(&server);
    let retry = RetryPolicy {
        max_attempts: 3,
        ..RetryPolicy::no_retry()
    };
    let stats = retry
        .run("dashboard", || client.fetch_dashboard_stats("0xabc"))
        .await
        .unwrap();

    let DashboardStats::Active(active) = &stats else {
        panic!("expected active validator after retry, got {stats:?}");
    };
    assert_eq!(active.balance, 1000);
    assert_eq!(active.attestations_succeeded, 10);
}

#[tokio::test]
async fn dashboard_rate_limit_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "error": "Too many requests" })),
        )
        .mount(&server)
        .await;

    let err = dashboard(&server)
        .fetch_dashboard_stats("0xabc")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TransportError::Status { status, .. } if status.as_u16() == 429),
        "{err:?}"
    );
}

#[tokio::test]
async fn dashboard_malformed_active_payload_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "index": 5,
            "status": "validating",
            "balance": "oops"
        })))
        .mount(&server)
        .await;

    let err = dashboard(&server)
        .fetch_dashboard_stats("0xabc")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::UnexpectedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn explorer_reads_first_block_height() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/l2/ui/blocks-for-table"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "height": "73012", "blockHash": "0xaa" },
            { "height": "73011", "blockHash": "0xbb" }
        ])))
        .mount(&server)
        .await;

    let config = ExplorerConfig {
        url: format!("{}/l2/ui/blocks-for-table", server.uri()),
    };
    let height = ExplorerClient::new(http(), &config)
        .fetch_explorer_height()
        .await
        .unwrap();
    assert_eq!(height, 73_012);
}

#[tokio::test]
async fn explorer_empty_table_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = ExplorerConfig {
        url: server.uri(),
    };
    let err = ExplorerClient::new(http(), &config)
        .fetch_explorer_height()
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::UnexpectedResponse(_)), "{err:?}");
}
