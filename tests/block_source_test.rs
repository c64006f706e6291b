use base64::Engine;
use serde_json::json;
use solana_idl_parser::{event_discriminator, parse_idl};
use solana_tx_collector::{
    CollectorError, ProgramLogDecoder, RateLimiter, RelevanceFilter, RetryConfig, RpcBlockSource,
};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KAMINO: &str = "KLend2g3cP87fffoy8q1mQqGKjrxjC8boSyAYavgmjD";
const USER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

async fn mock_node() -> MockServer {
    let mock_server = MockServer::start().await;

    // Mock version call which RpcClient may make
    Mock::given(method("POST"))
        .and(body_string_contains("getVersion"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "solana-core": "2.2.0", "feature-set": 0 },
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    mock_server
}

fn source(server: &MockServer, retry: RetryConfig) -> RpcBlockSource {
    RpcBlockSource::new(&server.uri(), Arc::new(RateLimiter::new(100)), retry)
}

fn flag_event_log() -> String {
    let mut bytes = event_discriminator("FlagEvent").to_vec();
    bytes.extend_from_slice(&[0x01, 0x2A, 0x00]);
    format!(
        "Program data: {}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn block_response(slot: u64) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "previousBlockhash": "4sGjMW1sUnHzSxGspuhpqLDx6wiyjNtZAMdL4VZHirAn",
            "blockhash": "8xfTyUvqxG6Gz2wDp4LqgjEcLD5rQJ3kP7WcYH4rRH2w",
            "parentSlot": slot - 1,
            "blockTime": 1_678_888_888,
            "blockHeight": slot,
            "transactions": [
                {
                    "transaction": {
                        "signatures": ["lendSig"],
                        "message": {
                            "accountKeys": [
                                { "pubkey": USER, "signer": true, "writable": true, "source": "transaction" },
                                { "pubkey": KAMINO, "signer": false, "writable": false, "source": "transaction" }
                            ],
                            "instructions": [],
                            "recentBlockhash": "11111111111111111111111111111111"
                        }
                    },
                    "meta": {
                        "err": null,
                        "status": { "Ok": null },
                        "fee": 5000,
                        "preBalances": [100000, 1],
                        "postBalances": [95000, 1],
                        "innerInstructions": [],
                        "logMessages": [
                            format!("Program {KAMINO} invoke [1]"),
                            flag_event_log(),
                            format!("Program {KAMINO} success")
                        ],
                        "preTokenBalances": [],
                        "postTokenBalances": [],
                        "rewards": []
                    }
                },
                {
                    "transaction": {
                        "signatures": ["transferSig"],
                        "message": {
                            "accountKeys": [
                                { "pubkey": USER, "signer": true, "writable": true, "source": "transaction" }
                            ],
                            "instructions": [],
                            "recentBlockhash": "11111111111111111111111111111111"
                        }
                    },
                    "meta": null
                }
            ]
        },
        "id": 1
    })
}

#[tokio::test]
async fn test_fetch_block_filter_and_decode() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_response(42)))
        .mount(&mock_server)
        .await;

    let block = source(&mock_server, RetryConfig::fixed(0))
        .fetch_block(42)
        .await
        .unwrap()
        .expect("block should be returned");

    assert_eq!(block.parent_slot, 41);
    assert_eq!(block.block_time, Some(1_678_888_888));

    let filter = RelevanceFilter::new(vec![KAMINO.to_string()]);
    let relevant: Vec<_> = block
        .transactions
        .unwrap_or_default()
        .into_iter()
        .filter(|tx| filter.is_relevant(tx))
        .collect();
    assert_eq!(relevant.len(), 1);

    let idl = parse_idl(
        r#"{"name": "klend", "version": "0.1.0", "events": [
            {"name": "FlagEvent", "fields": [
                {"name": "flag", "type": "bool"},
                {"name": "count", "type": "u16"}
            ]}
        ]}"#,
    )
    .unwrap();
    let mut decoder = ProgramLogDecoder::new();
    decoder.register_idl(Some(KAMINO), &idl).unwrap();

    let decoded = decoder.decode_transaction(&relevant[0]);
    assert!(decoded.failures.is_empty());
    let events = decoded.events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.name, "FlagEvent");
    assert_eq!(events[0].event.get("count").and_then(|v| v.as_u64()), Some(42));
}

#[tokio::test]
async fn test_transient_http_errors_are_retried() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_response(7)))
        .mount(&mock_server)
        .await;

    let block = source(&mock_server, RetryConfig::fixed(0))
        .fetch_block(7)
        .await
        .unwrap();

    assert!(block.is_some());
}

#[tokio::test]
async fn test_forbidden_request_fails_fast_without_skipping() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = source(&mock_server, RetryConfig::fixed(0).with_max_retries(5))
        .fetch_block(13)
        .await;

    assert!(matches!(result, Err(CollectorError::RpcClientError(_))));
}

#[tokio::test]
async fn test_unreachable_node_is_retried() {
    let source = RpcBlockSource::new(
        "http://127.0.0.1:1",
        Arc::new(RateLimiter::new(100)),
        RetryConfig::fixed(0).with_max_retries(1),
    );

    let result = source.fetch_block(13).await;

    assert!(matches!(
        result,
        Err(CollectorError::RetryExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_skipped_slot_is_not_retried() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32009,
                "message": "Slot 9 was skipped, or missing in long-term storage"
            },
            "id": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let block = source(&mock_server, RetryConfig::fixed(0))
        .fetch_block(9)
        .await
        .unwrap();

    assert!(block.is_none());
}

#[tokio::test]
async fn test_node_behind_exhausts_bounded_retries() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getBlock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32004, "message": "Block not available for slot 11" },
            "id": 1
        })))
        .expect(3)
        .mount(&mock_server)
        .await;

    let result = source(&mock_server, RetryConfig::fixed(0).with_max_retries(2))
        .fetch_block(11)
        .await;

    assert!(matches!(
        result,
        Err(CollectorError::RetryExhausted { attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_latest_finalized_slot() {
    let mock_server = mock_node().await;
    Mock::given(method("POST"))
        .and(body_string_contains("getSlot"))
        .and(body_string_contains("finalized"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": 287_654_321u64,
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    let slot = source(&mock_server, RetryConfig::fixed(0))
        .latest_finalized_slot()
        .await
        .unwrap();

    assert_eq!(slot, 287_654_321);
}
