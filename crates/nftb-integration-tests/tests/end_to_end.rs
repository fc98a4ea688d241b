//! # End-to-End Bridging
//!
//! Token #1 with URI "abc" moves from the source chain to the destination
//! chain: the source bridge escrows it, the owner's nonce advances, and the
//! owner holds a freshly minted token on the destination chain.

mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use nftb_core::{TokenUri, U256};
use nftb_ledger::{BlockRange, ChainReader, CommitFilter, SourceLedger};
use nftb_protocol::{is_final, RetryPolicy};
use nftb_state::{RequestLifecycle, RequestPhase};

use common::Harness;

#[tokio::test]
async fn bridges_token_with_immediate_finality() {
    let h = Harness::new(0);
    let report = h
        .flow(RetryPolicy::immediate(5))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.new_token_id(), U256::ZERO);
    assert_eq!(report.request_id.request_nonce, U256::ZERO);
    assert_eq!(report.attestation.token_uri, TokenUri::from("abc"));
    assert_eq!(report.lifecycle.phase, RequestPhase::Done);
    assert_eq!(report.lifecycle.new_token_id, Some(U256::ZERO));

    let reader = h.source.connect(h.owner_address());
    assert_eq!(
        reader
            .owner_of(h.context.from_token, U256::from(1u64))
            .await
            .unwrap(),
        h.context.from_bridge,
        "source token is escrowed by the bridge"
    );
    assert_eq!(
        reader
            .request_nonce(h.context.from_bridge, h.owner_address())
            .await
            .unwrap(),
        U256::from(1u64)
    );
    assert_eq!(
        h.owner
            .destination_owner_of(h.context.to_token, U256::ZERO)
            .await
            .unwrap(),
        h.owner_address()
    );
}

#[tokio::test]
async fn lifecycle_records_every_phase_in_order() {
    let h = Harness::new(0);
    let report = h
        .flow(RetryPolicy::immediate(5))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap();

    let phases: Vec<RequestPhase> = report.lifecycle.history.iter().map(|t| t.to).collect();
    assert_eq!(phases.last(), Some(&RequestPhase::Done));
    assert!(phases.windows(2).all(|w| w[0] != w[1]));
    assert!(report.lifecycle.failure.is_none());
    assert_eq!(
        report.lifecycle.commitment,
        Some(report.attestation.commitment.0)
    );

    let json = serde_json::to_string(&report.lifecycle).unwrap();
    let restored: RequestLifecycle = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.flow_id, report.lifecycle.flow_id);
    assert_eq!(restored.history, report.lifecycle.history);
    assert_eq!(restored.new_token_id, Some(report.new_token_id()));
}

#[tokio::test]
async fn acquisition_waits_for_commit_finality() {
    let h = Harness::new(3);
    let miner = h.spawn_miner(Duration::from_millis(5));
    let report = h
        .flow(RetryPolicy::immediate(500))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap();
    miner.cancel();

    let commit_block = report.lifecycle.commit_block.unwrap();
    let filter = CommitFilter::by_request(h.owner_address(), U256::ZERO);
    let commits = h
        .source
        .connect(h.owner_address())
        .commit_events(h.context.from_bridge, &filter, BlockRange::all())
        .await
        .unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].block_number, commit_block);

    assert!(is_final(commit_block, h.source.head(), 3));
    assert_eq!(report.new_token_id(), U256::ZERO);
}

#[tokio::test]
async fn commitment_is_single_use() {
    let h = Harness::new(0);
    let report = h
        .flow(RetryPolicy::immediate(5))
        .run(h.context.clone(), U256::from(1u64), &CancellationToken::new())
        .await
        .unwrap();

    // Replaying the same acquisition is refused locally before any transaction.
    let request = h.request(0);
    let secret = h.validator.reveal_secret(&request.id).await.unwrap();
    let signature = h
        .owner
        .fetch_validator_signature(h.context.from_bridge, U256::ZERO)
        .await
        .unwrap();
    let commit = h
        .owner
        .wait_for_finality(&request.id, &RetryPolicy::immediate(1), &CancellationToken::new())
        .await
        .unwrap();
    let head = h.destination.head();
    let err = h
        .owner
        .acquire(&request, &commit.event, secret, signature)
        .await
        .unwrap_err();
    assert_eq!(err.category(), nftb_core::ErrorCategory::Protocol);
    assert_eq!(h.destination.head(), head);
    assert_eq!(report.new_token_id(), U256::ZERO);
}
