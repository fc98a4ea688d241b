//! # Validator Routes
//!
//! The validator's three owner-facing operations:
//!
//! - `POST /v1/challenges` issues the authentication challenge for a request.
//! - `POST /v1/requests` validates a signed request and commits it.
//! - `POST /v1/secrets` reveals the secret of a final commit.
//!
//! Handlers only unwrap the body and delegate to [`ValidatorService`]; all
//! checks live in `nftb-protocol`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use nftb_core::BridgeRequestId;
use nftb_crypto::{AuthnChallenge, Secret};
use nftb_protocol::{CommitAttestation, SignedBridgeRequest};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Body of `POST /v1/challenges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub request_id: BridgeRequestId,
}

/// Response of `POST /v1/challenges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub authn_challenge: AuthnChallenge,
}

/// Body of `POST /v1/secrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRequest {
    pub request_id: BridgeRequestId,
}

/// Response of `POST /v1/secrets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretResponse {
    pub secret: Secret,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/challenges", post(issue_challenge))
        .route("/v1/requests", post(process_request))
        .route("/v1/secrets", post(reveal_secret))
}

async fn issue_challenge(
    State(state): State<AppState>,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let req = extract_json(body)?;
    let authn_challenge = state.validator.issue_challenge(&req.request_id).await?;
    Ok(Json(ChallengeResponse { authn_challenge }))
}

async fn process_request(
    State(state): State<AppState>,
    body: Result<Json<SignedBridgeRequest>, JsonRejection>,
) -> Result<Json<CommitAttestation>, AppError> {
    let req = extract_json(body)?;
    tracing::debug!(request = %req.request.id, "signed request received");
    let attestation = state.validator.process_request(&req).await?;
    Ok(Json(attestation))
}

async fn reveal_secret(
    State(state): State<AppState>,
    body: Result<Json<SecretRequest>, JsonRejection>,
) -> Result<Json<SecretResponse>, AppError> {
    let req = extract_json(body)?;
    let secret = state.validator.reveal_secret(&req.request_id).await?;
    Ok(Json(SecretResponse { secret }))
}
