//! # Negative Scenarios
//!
//! Every refused request leaves the source chain untouched: no commit
//! transaction, no escrow, no nonce change.

mod common;

use nftb_core::{
    BridgeContext, BridgeError, BridgeRequest, BridgeRequestId, ChainId, NotReady,
    TokenUri, ValidationFailure, U256,
};
use nftb_crypto::{AuthnChallenge, OwnerMessage, ProtocolMessage, SigningKey};
use nftb_ledger::{BlockRange, ChainReader, CommitFilter, SourceLedger};
use nftb_protocol::SignedBridgeRequest;

use common::Harness;

fn rejection(err: BridgeError) -> ValidationFailure {
    match err {
        BridgeError::Rejected(f) => f,
        other => panic!("expected a validation failure, got {other}"),
    }
}

#[tokio::test]
async fn stale_nonce_sends_no_commit() {
    let h = Harness::new(0);
    h.approve().await;
    let signed = h.signed(h.request(1)).await;
    let head = h.source.head();

    let err = h.validator.process_request(&signed).await.unwrap_err();
    assert_eq!(
        rejection(err),
        ValidationFailure::NonceMismatch {
            owner: h.owner_address(),
            requested: U256::from(1u64),
            current: U256::ZERO,
        }
    );
    assert_eq!(h.source.head(), head);
    let commits = h
        .source
        .connect(h.owner_address())
        .commit_events(
            h.context.from_bridge,
            &CommitFilter::default(),
            BlockRange::all(),
        )
        .await
        .unwrap();
    assert!(commits.is_empty());
}

#[tokio::test]
async fn replayed_request_is_refused_after_transfer() {
    let h = Harness::new(0);
    h.approve().await;
    let signed = h.signed(h.request(0)).await;
    h.validator.process_request(&signed).await.unwrap();

    let err = h.validator.process_request(&signed).await.unwrap_err();
    assert_eq!(
        rejection(err),
        ValidationFailure::NotTokenOwner {
            token_id: U256::from(1u64),
            claimed: h.owner_address(),
            actual: h.context.from_bridge,
        }
    );
}

#[tokio::test]
async fn concurrent_submissions_commit_once() {
    let h = Harness::new(0);
    h.approve().await;
    let signed = h.signed(h.request(0)).await;

    let (a, b) = tokio::join!(
        h.validator.process_request(&signed),
        h.validator.process_request(&signed)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

    let commits = h
        .source
        .connect(h.owner_address())
        .commit_events(
            h.context.from_bridge,
            &CommitFilter::by_request(h.owner_address(), U256::ZERO),
            BlockRange::all(),
        )
        .await
        .unwrap();
    assert_eq!(commits.len(), 1);
}

#[tokio::test]
async fn reveal_waits_for_finality() {
    let h = Harness::new(5);
    h.approve().await;
    let request = h.request(0);
    let attestation = h
        .validator
        .process_request(&h.signed(request.clone()).await)
        .await
        .unwrap();

    let err = h.validator.reveal_secret(&request.id).await.unwrap_err();
    match err {
        BridgeError::NotReady(NotReady::NotFinal {
            event_block,
            threshold,
            ..
        }) => {
            assert_eq!(event_block, attestation.commit_tx.block_number);
            assert_eq!(threshold, 5);
        }
        other => panic!("expected NotFinal, got {other}"),
    }
    assert!(!h.owner.is_commit_tx_finalized(&request.id).await.unwrap());

    h.source.mine(5);
    let secret = h.validator.reveal_secret(&request.id).await.unwrap();
    assert!(attestation.commitment.is_opened_by(&secret));
    assert!(h.owner.is_commit_tx_finalized(&request.id).await.unwrap());
}

#[tokio::test]
async fn reveal_without_commit_is_not_ready() {
    let h = Harness::new(0);
    let err = h.validator.reveal_secret(&h.request(0).id).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::NotReady(NotReady::CommitNotMined { .. })
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn signature_from_another_key_is_refused() {
    let h = Harness::new(0);
    h.approve().await;
    let request = h.request(0);
    let challenge = h.validator.issue_challenge(&request.id).await.unwrap();
    let forged = OwnerMessage::for_request(&request, &challenge)
        .sign(&SigningKey::generate())
        .unwrap();

    let err = h
        .validator
        .process_request(&SignedBridgeRequest {
            request,
            authn_challenge: challenge,
            owner_signature: forged,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationFailure::InvalidOwnerSignature { .. }
    ));
}

#[tokio::test]
async fn tampered_request_is_refused() {
    let h = Harness::new(0);
    h.approve().await;
    let mut signed = h.signed(h.request(0)).await;
    signed.request.token_uri = TokenUri::from("abd");

    let err = h.validator.process_request(&signed).await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationFailure::InvalidOwnerSignature { .. }
    ));
}

#[tokio::test]
async fn owner_signed_uri_must_match_source() {
    let h = Harness::new(0);
    h.approve().await;
    let mut request = h.request(0);
    request.token_uri = TokenUri::from("ipfs://elsewhere");
    let signed = h.signed(request).await;
    let head = h.source.head();

    let err = h.validator.process_request(&signed).await.unwrap_err();
    assert_eq!(
        rejection(err),
        ValidationFailure::TokenUriMismatch {
            token_id: U256::from(1u64),
            requested: TokenUri::from("ipfs://elsewhere"),
            ledger: TokenUri::from("abc"),
        }
    );
    assert_eq!(h.source.head(), head);
    let reader = h.source.connect(h.owner_address());
    assert_eq!(
        reader
            .owner_of(h.context.from_token, U256::from(1u64))
            .await
            .unwrap(),
        h.owner_address()
    );
    assert_eq!(
        reader
            .request_nonce(h.context.from_bridge, h.owner_address())
            .await
            .unwrap(),
        U256::ZERO
    );
}

#[tokio::test]
async fn foreign_or_placeholder_challenge_is_refused() {
    let h = Harness::new(0);
    h.approve().await;
    let request = h.request(0);
    let other = h.request(7);
    let foreign = h.validator.issue_challenge(&other.id).await.unwrap();

    for challenge in [AuthnChallenge::placeholder(), foreign] {
        let owner_signature = h.owner.sign_request(&request, &challenge).unwrap();
        let err = h
            .validator
            .process_request(&SignedBridgeRequest {
                request: request.clone(),
                authn_challenge: challenge,
                owner_signature,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            rejection(err),
            ValidationFailure::InvalidChallenge { .. }
        ));
    }
}

#[tokio::test]
async fn missing_approval_is_refused() {
    let h = Harness::new(0);
    let signed = h.signed(h.request(0)).await;
    let head = h.source.head();

    let err = h.validator.process_request(&signed).await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationFailure::BridgeNotApproved { .. }
    ));
    assert_eq!(h.source.head(), head);
    assert_eq!(
        h.source
            .connect(h.owner_address())
            .owner_of(h.context.from_token, U256::from(1u64))
            .await
            .unwrap(),
        h.owner_address()
    );
}

#[tokio::test]
async fn non_owner_is_refused() {
    let h = Harness::new(0);
    h.approve().await;
    let intruder = SigningKey::generate();
    let request = BridgeRequest::new(
        BridgeRequestId::new(h.context.clone(), intruder.address(), U256::ZERO),
        U256::from(1u64),
        TokenUri::from("abc"),
    );
    let challenge = h.validator.issue_challenge(&request.id).await.unwrap();
    let owner_signature = OwnerMessage::for_request(&request, &challenge)
        .sign(&intruder)
        .unwrap();

    let err = h
        .validator
        .process_request(&SignedBridgeRequest {
            request,
            authn_challenge: challenge,
            owner_signature,
        })
        .await
        .unwrap_err();
    assert_eq!(
        rejection(err),
        ValidationFailure::NotTokenOwner {
            token_id: U256::from(1u64),
            claimed: intruder.address(),
            actual: h.owner_address(),
        }
    );
}

#[tokio::test]
async fn unsupported_source_chain_is_refused() {
    let h = Harness::new(0);
    let context = BridgeContext::new(
        ChainId(56),
        h.context.from_token,
        h.context.from_bridge,
        h.context.to_chain_id,
        h.context.to_token,
        h.context.to_bridge,
    );
    let request = BridgeRequest::new(
        BridgeRequestId::new(context, h.owner_address(), U256::ZERO),
        U256::from(1u64),
        TokenUri::from("abc"),
    );
    assert!(h.validator.issue_challenge(&request.id).await.is_err());

    let challenge = AuthnChallenge::placeholder();
    let owner_signature = h.owner.sign_request(&request, &challenge).unwrap();
    let err = h
        .validator
        .process_request(&SignedBridgeRequest {
            request,
            authn_challenge: challenge,
            owner_signature,
        })
        .await
        .unwrap_err();
    assert_eq!(
        rejection(err),
        ValidationFailure::UnsupportedChain {
            chain_id: ChainId(56)
        }
    );
}
