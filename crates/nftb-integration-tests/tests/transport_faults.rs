//! # Transport Faults
//!
//! RPC failures are retryable: bounded waits absorb them, while one-shot
//! steps surface them with the transport category.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use nftb_api::ValidatorHttpClient;
use nftb_core::{BridgeError, ErrorCategory, U256};
use nftb_protocol::{FlowError, RetryPolicy};
use nftb_state::RequestPhase;

use common::Harness;

#[tokio::test]
async fn finality_wait_rides_out_rpc_failures() {
    let h = Harness::new(0);
    h.approve().await;
    let request = h.request(0);
    h.validator
        .process_request(&h.signed(request.clone()).await)
        .await
        .unwrap();

    h.source.inject_rpc_failures(3);
    let event = h
        .owner
        .wait_for_finality(&request.id, &RetryPolicy::immediate(5), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(event.event.request_nonce, U256::ZERO);
}

#[tokio::test]
async fn exhausted_retries_time_out() {
    let h = Harness::new(0);
    h.approve().await;
    let request = h.request(0);
    h.validator
        .process_request(&h.signed(request.clone()).await)
        .await
        .unwrap();

    h.source.inject_rpc_failures(10);
    let err = h
        .owner
        .wait_for_finality(&request.id, &RetryPolicy::immediate(3), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { attempts: 3, .. }));
}

#[tokio::test]
async fn rpc_failure_on_first_step_fails_the_flow() {
    let h = Harness::new(0);
    h.source.inject_rpc_failures(1);
    let failure = h
        .flow(RetryPolicy::immediate(5))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(failure.error.category(), ErrorCategory::Transport);
    assert_eq!(failure.lifecycle.phase, RequestPhase::Failed);
    let record = failure.lifecycle.failure.unwrap();
    assert_eq!(record.phase, RequestPhase::Created);
    assert_eq!(record.category, "transport");
}

#[tokio::test]
async fn cancelled_flow_stops_waiting() {
    let h = Harness::new(50);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let failure = h
        .flow(RetryPolicy::immediate(1_000_000))
        .run(h.context.clone(), U256::from(1u64), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        failure.error,
        FlowError::Bridge(BridgeError::Cancelled { .. })
    ));
    assert_eq!(failure.lifecycle.phase, RequestPhase::Failed);
}

#[tokio::test]
async fn unreachable_validator_fails_as_transport() {
    let h = Harness::new(0);
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ValidatorHttpClient::new(
        Url::parse(&format!("http://{addr}/")).unwrap(),
        Duration::from_secs(2),
    )
    .unwrap();

    let failure = h
        .flow_with(Arc::new(client), RetryPolicy::immediate(2))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(failure.error.category(), ErrorCategory::Transport);
    // Approval and nonce steps already ran against the ledger.
    assert!(failure.lifecycle.request_nonce.is_some());
}
