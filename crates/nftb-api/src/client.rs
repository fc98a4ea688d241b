//! # Validator HTTP Client
//!
//! Typed `reqwest` client for the routes in [`crate::routes::validator`].
//! Implements [`ValidatorService`], so an `OwnerFlow` drives a remote
//! validator exactly like an in-process one.
//!
//! Structured server errors are rebuilt into the original
//! [`BridgeError`] variant. Connection failures and unparseable bodies
//! become [`BridgeError::Remote`] with the transport category, which keeps
//! them retryable.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use nftb_core::{BridgeError, BridgeRequestId, ErrorCategory};
use nftb_crypto::{AuthnChallenge, Secret};
use nftb_protocol::{CommitAttestation, SignedBridgeRequest, ValidatorService};

use crate::error::ErrorBody;
use crate::routes::validator::{ChallengeRequest, ChallengeResponse, SecretRequest, SecretResponse};

/// Client for a remote validator.
#[derive(Debug, Clone)]
pub struct ValidatorHttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ValidatorHttpClient {
    /// Build a client for the validator at `base_url`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BridgeError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.base_url.join(path).map_err(|e| BridgeError::Remote {
            category: ErrorCategory::Protocol,
            message: format!("invalid validator url {}{path}: {e}", self.base_url),
        })?;

        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::debug!(%url, status = status.as_u16(), "validator returned an error");
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => body.into_bridge_error(status.as_u16()),
                Err(_) => BridgeError::Remote {
                    category: if status.is_server_error() {
                        ErrorCategory::Transport
                    } else {
                        ErrorCategory::Validation
                    },
                    message: format!("{url} returned {status}: {text}"),
                },
            });
        }

        resp.json().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> BridgeError {
    BridgeError::Remote {
        category: ErrorCategory::Transport,
        message: err.to_string(),
    }
}

#[async_trait]
impl ValidatorService for ValidatorHttpClient {
    async fn issue_challenge(
        &self,
        request_id: &BridgeRequestId,
    ) -> Result<AuthnChallenge, BridgeError> {
        let resp: ChallengeResponse = self
            .post(
                "v1/challenges",
                &ChallengeRequest {
                    request_id: request_id.clone(),
                },
            )
            .await?;
        Ok(resp.authn_challenge)
    }

    async fn process_request(
        &self,
        request: &SignedBridgeRequest,
    ) -> Result<CommitAttestation, BridgeError> {
        self.post("v1/requests", request).await
    }

    async fn reveal_secret(&self, request_id: &BridgeRequestId) -> Result<Secret, BridgeError> {
        let resp: SecretResponse = self
            .post(
                "v1/secrets",
                &SecretRequest {
                    request_id: request_id.clone(),
                },
            )
            .await?;
        Ok(resp.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_validator_is_retryable_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = ValidatorHttpClient::new(
            Url::parse(&format!("http://{addr}/")).unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();
        let id = BridgeRequestId::new(
            nftb_core::BridgeContext::new(
                nftb_core::ChainId(31337),
                nftb_core::Address::repeat_byte(1),
                nftb_core::Address::repeat_byte(2),
                nftb_core::ChainId(31338),
                nftb_core::Address::repeat_byte(3),
                nftb_core::Address::repeat_byte(4),
            ),
            nftb_core::Address::repeat_byte(5),
            nftb_core::U256::ZERO,
        );
        let err = client.issue_challenge(&id).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert!(err.is_retryable());
    }
}
